#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use navgraph::config::Settings;
use navgraph::error::{GraphError, Result};
use navgraph::events::{Notice, Subscription};
use navgraph::host::{
    DocumentSymbol, FsHost, Host, Location, SymbolKind, TextPosition, TextRange,
};
use navgraph::model::{GraphStore, KeyValueStore, MemoryStore};
use navgraph::plugins::PluginIndex;
use navgraph::tracker::NavigationTracker;

/// Real files on disk, scripted language features, recorded editor actions.
pub struct ScriptedHost {
    fs: FsHost,
    outlines: Mutex<HashMap<PathBuf, Vec<DocumentSymbol>>>,
    definitions: Mutex<HashMap<(PathBuf, u32), PathBuf>>,
    unopenable: Mutex<HashSet<PathBuf>>,
    outline_gate: Mutex<Option<Arc<Notify>>>,
    pub opened: Mutex<Vec<PathBuf>>,
    pub closed: Mutex<Vec<PathBuf>>,
}

impl ScriptedHost {
    pub fn new(root: &Path) -> Self {
        Self {
            fs: FsHost::new(root),
            outlines: Mutex::new(HashMap::new()),
            definitions: Mutex::new(HashMap::new()),
            unopenable: Mutex::new(HashSet::new()),
            outline_gate: Mutex::new(None),
            opened: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outline(&self, path: &Path, outline: Vec<DocumentSymbol>) {
        self.outlines
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), outline);
    }

    pub fn set_definition(&self, path: &Path, line: u32, target: &Path) {
        self.definitions
            .lock()
            .unwrap()
            .insert((path.to_path_buf(), line), target.to_path_buf());
    }

    /// Outline requests stay pending until the returned gate is notified.
    pub fn hold_outlines(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.outline_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn refuse_open(&self, path: &Path) {
        self.unopenable.lock().unwrap().insert(path.to_path_buf());
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<PathBuf> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Host for ScriptedHost {
    async fn open_document(&self, path: &Path) -> Result<()> {
        if self.unopenable.lock().unwrap().contains(path) {
            return Err(GraphError::Unavailable(format!("{} is locked", path.display())));
        }
        self.fs.open_document(path).await?;
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close_document(&self, path: &Path) -> Result<()> {
        self.closed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn read_document(&self, path: &Path) -> Result<String> {
        self.fs.read_document(path).await
    }

    async fn document_symbols(&self, path: &Path) -> Result<Vec<DocumentSymbol>> {
        let gate = self.outline_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .outlines
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn definition_location(
        &self,
        path: &Path,
        position: TextPosition,
    ) -> Result<Option<Location>> {
        let target = self
            .definitions
            .lock()
            .unwrap()
            .get(&(path.to_path_buf(), position.line))
            .cloned();
        Ok(target.map(|path| Location {
            path,
            range: TextRange::new(TextPosition::new(0, 0), TextPosition::new(0, 0)),
        }))
    }

    async fn find_files(
        &self,
        include: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PathBuf>> {
        self.fs.find_files(include, exclude, limit).await
    }
}

/// Three plugins: `foo` needs `bar`, `baz` needs `bar`, `bar` needs nothing.
pub struct Workspace {
    pub dir: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let workspace = Self { dir, root };
        workspace.write(
            "plugins/foo/kibana.jsonc",
            r#"{
  // the journey starts here
  "id": "@kbn/foo-plugin",
  "plugin": { "id": "foo", "requiredPlugins": ["bar"] },
}"#,
        );
        workspace.write(
            "plugins/bar/kibana.jsonc",
            r#"{"id": "@kbn/bar-plugin", "plugin": {"id": "bar", "requiredPlugins": []}}"#,
        );
        workspace.write(
            "plugins/baz/kibana.jsonc",
            r#"{"id": "@kbn/baz-plugin", "plugin": {"id": "baz", "requiredPlugins": ["bar"]}}"#,
        );
        workspace.write(
            "plugins/foo/public/a.ts",
            "import { doThing } from '@kbn/bar-plugin/public/b';\n\nexport function render() {\n  return doThing();\n}\n",
        );
        workspace.write("plugins/bar/public/b.ts", "export function doThing() {\n  return 1;\n}\n");
        workspace.write("plugins/baz/public/c.ts", "export const c = 3;\n");
        workspace.write("scripts/loose.ts", "console.log('no plugin');\n");
        workspace
    }

    pub fn write(&self, relative: &str, text: &str) {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn a(&self) -> PathBuf {
        self.path("plugins/foo/public/a.ts")
    }

    pub fn b(&self) -> PathBuf {
        self.path("plugins/bar/public/b.ts")
    }

    pub fn c(&self) -> PathBuf {
        self.path("plugins/baz/public/c.ts")
    }
}

pub struct Harness {
    pub workspace: Workspace,
    pub host: Arc<ScriptedHost>,
    pub backend: Arc<dyn KeyValueStore>,
    pub tracker: NavigationTracker,
    pub notices: Arc<Mutex<Vec<Notice>>>,
    _subscription: Subscription,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_backend(Workspace::new(), Arc::new(MemoryStore::new())).await
    }

    pub async fn with_backend(workspace: Workspace, backend: Arc<dyn KeyValueStore>) -> Self {
        let settings = Settings::default();
        let host = Arc::new(ScriptedHost::new(&workspace.root));
        let plugins = Arc::new(PluginIndex::new(&workspace.root, &settings));
        let store = GraphStore::load(Arc::clone(&backend));
        let mut tracker = NavigationTracker::new(host.clone(), plugins, store, &settings);
        tracker.initialize_plugins().await;

        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notices);
        let subscription =
            tracker.subscribe(move |notice| sink.lock().unwrap().push(notice.clone()));

        Self {
            workspace,
            host,
            backend,
            tracker,
            notices,
            _subscription: subscription,
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter_map(|notice| match notice {
                Notice::Warning(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

pub fn function_symbol(name: &str, lines: (u32, u32)) -> DocumentSymbol {
    let range = TextRange::new(TextPosition::new(lines.0, 0), TextPosition::new(lines.1, 1));
    DocumentSymbol {
        name: name.to_owned(),
        kind: SymbolKind::Function,
        range,
        selection_range: TextRange::new(
            TextPosition::new(lines.0, 16),
            TextPosition::new(lines.0, 16 + name.len() as u32),
        ),
        children: Vec::new(),
    }
}
