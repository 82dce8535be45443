use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::{LevelFilter, info, warn};
use serde_json::json;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use navgraph::config::{Settings, default_config_path};
use navgraph::events::{EditorEvent, Notice};
use navgraph::host::FsHost;
use navgraph::model::{GraphStore, JsonFileStore, ViewMode};
use navgraph::plugins::PluginIndex;
use navgraph::tracker::NavigationTracker;
use navgraph::viewer::GraphViewer;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Settings file; defaults to the per-user navgraph.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the workspace for plugin manifests and list them as JSON
    Scan {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
    /// Feed a JSON-lines script of editor events through the tracker
    Replay {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
    /// Print the complete-architecture layout as JSON
    Layout {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
    /// Open the graph viewer
    View {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// journey, plugin or complete
        #[arg(long)]
        mode: Option<String>,
    },
    /// Wipe the persisted graph
    Clear,
    /// Print the effective settings, optionally writing them to the settings file
    Config {
        #[arg(long)]
        write: bool,
    },
}

fn init_logging(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .build();
    if let Err(error) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("logger already initialized: {error}");
    }
}

fn open_store(settings: &Settings) -> GraphStore {
    let dir = settings.resolved_state_dir();
    info!("graph state in {}", dir.display());
    GraphStore::load(Arc::new(JsonFileStore::new(dir)))
}

fn canonical_workspace(workspace: &Path) -> Result<PathBuf> {
    workspace
        .canonicalize()
        .with_context(|| format!("workspace {} is not accessible", workspace.display()))
}

/// Tracker over the local filesystem with the plugin index already scanned.
async fn open_tracker(workspace: &Path, settings: &Settings) -> Result<NavigationTracker> {
    let root = canonical_workspace(workspace)?;
    let host = Arc::new(FsHost::new(&root));
    let plugins = Arc::new(PluginIndex::new(&root, settings));
    let mut tracker = NavigationTracker::new(host, plugins, open_store(settings), settings);
    tracker.initialize_plugins().await;
    Ok(tracker)
}

async fn scan(workspace: &Path, settings: &Settings) -> Result<()> {
    let tracker = open_tracker(workspace, settings).await?;
    let plugins = tracker
        .plugins()
        .list_all()
        .into_iter()
        .map(|plugin| {
            json!({
                "runtimeId": plugin.runtime_id,
                "packageId": plugin.package_id,
                "directory": plugin.directory,
                "requiredPlugins": plugin.required_plugins,
            })
        })
        .collect::<Vec<_>>();
    println!("{}", serde_json::to_string_pretty(&plugins)?);
    Ok(())
}

async fn replay(workspace: &Path, script: &Path, settings: &Settings) -> Result<()> {
    let raw = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let mut tracker = open_tracker(workspace, settings).await?;
    let _warnings = tracker.subscribe(|notice| {
        if let Notice::Warning(message) = notice {
            warn!("{message}");
        }
    });

    let mut replayed = 0usize;
    for (number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str::<EditorEvent>(line)
            .with_context(|| format!("{}:{}: invalid event", script.display(), number + 1))?;
        let is_selection = matches!(event, EditorEvent::Select { .. });
        tracker.handle_event(event).await;
        if is_selection {
            tracker.wait_for_symbol_lookup().await;
        }
        replayed += 1;
    }

    let state = tracker.state();
    info!(
        "replayed {replayed} events: {} files, {} edges, {} groups",
        state.nodes.len(),
        state.edges.len(),
        state.groups.len()
    );
    Ok(())
}

async fn layout(workspace: &Path, settings: &Settings) -> Result<()> {
    let mut tracker = open_tracker(workspace, settings).await?;
    tracker.wait_for_complete_layout();
    let projection = tracker.projection(ViewMode::Complete);
    let groups = projection
        .groups
        .iter()
        .map(|group| {
            json!({
                "id": group.id,
                "label": group.label,
                "x": group.position.x,
                "y": group.position.y,
                "width": group.width,
                "height": group.height,
            })
        })
        .collect::<Vec<_>>();
    let output = json!({ "groups": groups, "edges": projection.edges });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn view(workspace: &Path, mode: Option<&str>, settings: &Settings) -> Result<()> {
    let mode = match mode {
        Some(value) => Some(
            ViewMode::parse(value).ok_or_else(|| anyhow!("unknown view mode {value:?}"))?,
        ),
        None => None,
    };
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let tracker = runtime.block_on(open_tracker(workspace, settings))?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };
    eframe::run_native(
        "navgraph",
        options,
        Box::new(move |cc| Ok(Box::new(GraphViewer::new(cc, tracker, handle, mode)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}

fn clear(settings: &Settings) {
    let mut store = open_store(settings);
    store.clear();
    store.persist();
    info!("graph cleared");
}

fn show_config(args: &Args, settings: &Settings, write: bool) -> Result<()> {
    println!("{}", toml::to_string_pretty(settings)?);
    if !write {
        return Ok(());
    }
    let path = args
        .config
        .clone()
        .or_else(default_config_path)
        .ok_or_else(|| anyhow!("no settings path available on this platform"))?;
    settings.save_to(&path)?;
    info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        settings.log_filter()
    };
    init_logging(level);

    match &args.command {
        Command::View { workspace, mode } => view(workspace, mode.as_deref(), &settings),
        Command::Clear => {
            clear(&settings);
            Ok(())
        }
        Command::Config { write } => show_config(&args, &settings, *write),
        Command::Scan { workspace } => run_async(scan(workspace, &settings)),
        Command::Replay { workspace, script } => run_async(replay(workspace, script, &settings)),
        Command::Layout { workspace } => run_async(layout(workspace, &settings)),
    }
}

fn run_async(task: impl std::future::Future<Output = Result<()>>) -> Result<()> {
    tokio::runtime::Runtime::new()
        .context("failed to start async runtime")?
        .block_on(task)
}
