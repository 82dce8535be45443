//! Turns editor events into graph mutations.

pub mod lifecycle;
pub mod pending;
pub mod resolve;
pub mod symbols;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

use crate::config::Settings;
use crate::events::{Dispatcher, EditorEvent, Notice, Subscription};
use crate::host::{Host, TextPosition, TextRange};
use crate::layout::groups::{file_slot, fit_group_to_files, ungrouped_file_position};
use crate::model::{
    FileNode, GraphState, GraphStore, NavigationEdge, Position, SymbolRef, ViewMode,
    push_unique_symbol,
};
use crate::plugins::PluginIndex;
use crate::projection::{CompleteLayoutCache, Projection, project};
use crate::util::{file_name, node_id_for_path, relative_dir};
use lifecycle::{
    ensure_plugin_group, prune_empty_dependency_groups, release_group_if_empty,
    settle_group_members, settle_top_level, top_up_dependencies,
};
use pending::{PendingSlot, PendingSymbol, identifier_at};
use resolve::resolve_import;
use symbols::outermost_enclosing;

/// How long a touched identifier may explain the next jump.
pub const SYMBOL_FRESHNESS_WINDOW: Duration = Duration::from_millis(3000);

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    FocusGraph,
    ClearGraph,
}

impl Command {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "focusGraph" | "focus-graph" | "focus" => Some(Self::FocusGraph),
            "clearGraph" | "clear-graph" | "clear" => Some(Self::ClearGraph),
            _ => None,
        }
    }
}

/// Session state machine over the graph store. One per editor session.
pub struct NavigationTracker {
    host: Arc<dyn Host>,
    plugins: Arc<PluginIndex>,
    store: GraphStore,
    freshness: Duration,
    highlight_for: Duration,
    layout_timeout: Duration,
    exclude_glob: String,
    previous_file: Option<PathBuf>,
    pending: Arc<Mutex<PendingSlot>>,
    lookup: Option<JoinHandle<()>>,
    active_node: Option<String>,
    highlight: Option<(String, Instant)>,
    notices: Dispatcher<Notice>,
    complete_layout: CompleteLayoutCache,
}

impl NavigationTracker {
    pub fn new(
        host: Arc<dyn Host>,
        plugins: Arc<PluginIndex>,
        store: GraphStore,
        settings: &Settings,
    ) -> Self {
        Self {
            host,
            plugins,
            store,
            freshness: settings.symbol_freshness(),
            highlight_for: settings.highlight_duration(),
            layout_timeout: settings.layout_timeout(),
            exclude_glob: settings.exclude_glob.clone(),
            previous_file: None,
            pending: Arc::new(Mutex::new(PendingSlot::default())),
            lookup: None,
            active_node: None,
            highlight: None,
            notices: Dispatcher::new(),
            complete_layout: CompleteLayoutCache::new(),
        }
    }

    pub fn state(&self) -> &GraphState {
        self.store.state()
    }

    pub fn plugins(&self) -> &PluginIndex {
        &self.plugins
    }

    pub fn previous_file(&self) -> Option<&Path> {
        self.previous_file.as_deref()
    }

    pub fn active_node_id(&self) -> Option<&str> {
        self.active_node.as_deref()
    }

    pub fn is_highlighted(&self, node_id: &str) -> bool {
        self.highlight
            .as_ref()
            .is_some_and(|(id, at)| id == node_id && at.elapsed() < self.highlight_for)
    }

    pub fn pending_symbol(&self) -> Option<PendingSymbol> {
        self.pending.lock().ok()?.peek().cloned()
    }

    pub fn subscribe(&self, handler: impl FnMut(&Notice) + Send + 'static) -> Subscription {
        self.notices.subscribe(handler)
    }

    fn commit(&mut self) {
        self.store.persist();
        self.notices.emit(&Notice::GraphChanged);
    }

    pub async fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::Focus { path } => self.on_focus_changed(&path),
            EditorEvent::Close { path } => self.on_document_closed(&path),
            EditorEvent::Select {
                path,
                selection,
                line_text,
            } => self.on_selection_changed(&path, selection, &line_text),
            EditorEvent::Mode { mode } => match ViewMode::parse(&mode) {
                Some(mode) => self.on_view_mode_changed(mode),
                None => debug!("ignoring unknown view mode {mode:?}"),
            },
            EditorEvent::Command { command } => match Command::parse(&command) {
                Some(command) => self.execute(command).await,
                None => debug!("ignoring unknown command {command:?}"),
            },
        }
    }

    /// Focus moved to `path`.
    pub fn on_focus_changed(&mut self, path: &Path) {
        let now = Instant::now();
        let pending = self
            .pending
            .lock()
            .ok()
            .and_then(|mut slot| slot.take_fresh(path, self.freshness, now));

        let mut changed = false;
        let node_id = match self.store.node_by_path(path).map(|node| node.id.clone()) {
            Some(id) => {
                if let Some(pending) = &pending {
                    self.store.update_node(&id, |node| {
                        changed = push_unique_symbol(&mut node.symbols, pending.destination());
                    });
                }
                id
            }
            None => {
                let id = self.create_file_node(path);
                if let Some(pending) = &pending {
                    self.attach_symbols(&id, pending);
                }
                changed = true;
                id
            }
        };

        if let Some(previous) = self.previous_file.clone()
            && previous != path
            && let Some(previous_id) = self.store.node_by_path(&previous).map(|node| node.id.clone())
            && !self.store.has_navigation_edge_between(&previous_id, &node_id)
        {
            changed |= self
                .store
                .add_edge(NavigationEdge::navigation(&previous_id, &node_id));
        }

        if changed {
            self.commit();
        }
        self.active_node = Some(node_id.clone());
        self.highlight = Some((node_id.clone(), now));
        self.notices.emit(&Notice::Highlighted(node_id));
        self.previous_file = Some(path.to_path_buf());
    }

    fn create_file_node(&mut self, path: &Path) -> String {
        let id = node_id_for_path(path);
        let plugin = self.plugins.locate(path);

        let (group_id, base, plugin_name) = match &plugin {
            Some(plugin) => (
                Some(ensure_plugin_group(&mut self.store, &self.plugins, plugin)),
                plugin.directory.clone(),
                Some(plugin.label().to_owned()),
            ),
            None => (None, self.plugins.workspace_root().to_path_buf(), None),
        };

        let position = match &group_id {
            Some(group_id) => file_slot(self.store.state().file_count(group_id)),
            None => ungrouped_file_position(self.store.state()),
        };

        self.store.add_node(FileNode {
            id: id.clone(),
            file_path: path.to_path_buf(),
            file_name: file_name(path),
            relative_path: relative_dir(path, &base),
            plugin_name,
            group_id: group_id.clone(),
            position,
            symbols: Vec::new(),
            source_symbols: Vec::new(),
        });

        if let Some(group_id) = group_id {
            let count = self.store.state().file_count(&group_id);
            self.store
                .update_group(&group_id, |group| fit_group_to_files(group, count));
        }
        settle_top_level(&mut self.store);
        id
    }

    fn attach_symbols(&mut self, node_id: &str, pending: &PendingSymbol) {
        self.store.update_node(node_id, |node| {
            push_unique_symbol(&mut node.symbols, pending.destination());
        });

        let Some(enclosing) = pending.enclosing.clone() else {
            return;
        };
        let previous_id = self
            .previous_file
            .as_deref()
            .and_then(|previous| self.store.node_by_path(previous))
            .map(|node| node.id.clone());
        if let Some(previous_id) = previous_id {
            self.store.update_node(&previous_id, |node| {
                push_unique_symbol(&mut node.source_symbols, enclosing);
            });
        }
    }

    /// The editor closed `path`.
    pub fn on_document_closed(&mut self, path: &Path) {
        if self.previous_file.as_deref() == Some(path) {
            self.previous_file = None;
        }
        let Some(node_id) = self.store.node_by_path(path).map(|node| node.id.clone()) else {
            return;
        };

        let removed = self.store.remove_node(&node_id);
        if self.active_node.as_deref() == Some(node_id.as_str()) {
            self.active_node = None;
        }
        if let Some(group_id) = removed.and_then(|node| node.group_id) {
            let count = self.store.state().file_count(&group_id);
            if count == 0 {
                release_group_if_empty(&mut self.store, &group_id);
            } else {
                self.store
                    .update_group(&group_id, |group| fit_group_to_files(group, count));
            }
        }
        self.commit();
    }

    /// Caret or selection moved. Only a bare caret on an identifier is recorded.
    pub fn on_selection_changed(&mut self, path: &Path, selection: TextRange, line_text: &str) {
        if !selection.is_caret() {
            return;
        }
        let Some(name) = identifier_at(line_text, selection.start.character) else {
            return;
        };

        let generation = match self.pending.lock() {
            Ok(mut slot) => slot.record(
                name.clone(),
                selection.start.line,
                path.to_path_buf(),
                Instant::now(),
            ),
            Err(_) => return,
        };
        debug!("pending symbol {name} at {}:{}", path.display(), selection.start.line);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let host = Arc::clone(&self.host);
        let slot = Arc::clone(&self.pending);
        let path = path.to_path_buf();
        let caret = selection.start;
        self.lookup = Some(runtime.spawn(async move {
            let outline = match timeout(LOOKUP_TIMEOUT, host.document_symbols(&path)).await {
                Ok(Ok(outline)) => outline,
                Ok(Err(error)) => {
                    debug!("no outline for {}: {error}", path.display());
                    return;
                }
                Err(_) => {
                    warn!("outline lookup for {} timed out", path.display());
                    return;
                }
            };
            let Some(declaration) = outermost_enclosing(&outline, caret) else {
                return;
            };
            let enclosing = SymbolRef::new(
                declaration.name.clone(),
                declaration.selection_range.start.line,
                path.clone(),
            );
            if let Ok(mut slot) = slot.lock() {
                slot.resolve_enclosing(generation, enclosing);
            }
        }));
    }

    /// Waits for the outline lookup started by the last caret move, if any.
    pub async fn wait_for_symbol_lookup(&mut self) {
        if let Some(lookup) = self.lookup.take()
            && let Err(error) = lookup.await
        {
            warn!("symbol lookup task failed: {error}");
        }
    }

    pub fn on_view_mode_changed(&mut self, mode: ViewMode) {
        self.store.set_view_mode(mode);
        match mode {
            ViewMode::Plugin => {
                top_up_dependencies(&mut self.store, &self.plugins);
            }
            ViewMode::Journey => {
                prune_empty_dependency_groups(&mut self.store);
            }
            ViewMode::Complete => {}
        }
        debug!("view mode is now {}", mode.label());
        self.commit();
    }

    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::FocusGraph => self.notices.emit(&Notice::RevealPanel),
            Command::ClearGraph => self.clear_graph().await,
        }
    }

    async fn clear_graph(&mut self) {
        let open = self
            .store
            .state()
            .nodes
            .iter()
            .map(|node| node.file_path.clone())
            .collect::<Vec<_>>();
        for path in open {
            if let Err(error) = self.host.close_document(&path).await {
                warn!("cannot close {}: {error}", path.display());
            }
        }

        self.store.clear();
        self.previous_file = None;
        self.active_node = None;
        self.highlight = None;
        if let Ok(mut slot) = self.pending.lock() {
            slot.clear();
        }
        self.commit();
    }

    /// Opens the file a symbol annotation on `node_id` leads to: its definition,
    /// else the file it was imported from, else the node's own file. Failure to
    /// open is reported as a warning and changes nothing.
    pub async fn open_symbol(&self, node_id: &str, symbol: &SymbolRef) -> Option<PathBuf> {
        let Some(node_path) = self.store.node(node_id).map(|node| node.file_path.clone()) else {
            self.notices
                .emit(&Notice::Warning(format!("{node_id} is no longer in the graph")));
            return None;
        };

        let target = match self.definition_of(symbol).await {
            Some(path) => path,
            None => resolve_import(
                self.host.as_ref(),
                &self.plugins,
                &symbol.file_path,
                &symbol.name,
                Some(&self.exclude_glob),
            )
            .await
            .unwrap_or(node_path),
        };

        match self.host.open_document(&target).await {
            Ok(()) => Some(target),
            Err(error) => {
                self.notices
                    .emit(&Notice::Warning(format!("cannot open {}: {error}", target.display())));
                None
            }
        }
    }

    async fn definition_of(&self, symbol: &SymbolRef) -> Option<PathBuf> {
        let text = self.host.read_document(&symbol.file_path).await.ok()?;
        let line = text.lines().nth(symbol.line as usize)?;
        let character = line.find(symbol.name.as_str())?;
        let position = TextPosition::new(symbol.line, line[..character].chars().count() as u32);

        match timeout(
            LOOKUP_TIMEOUT,
            self.host.definition_location(&symbol.file_path, position),
        )
        .await
        {
            Ok(Ok(location)) => location.map(|location| location.path),
            Ok(Err(error)) => {
                debug!("definition lookup failed: {error}");
                None
            }
            Err(_) => {
                warn!("definition lookup for {} timed out", symbol.name);
                None
            }
        }
    }

    /// Drag of a group to an absolute position, then overlap removal.
    pub fn move_group(&mut self, group_id: &str, position: Position) -> bool {
        if !self
            .store
            .update_group(group_id, |group| group.position = position)
        {
            return false;
        }
        settle_top_level(&mut self.store);
        self.commit();
        true
    }

    /// Drag of a file; grouped files move in their group's frame.
    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        let Some(group_id) = self.store.node(node_id).map(|node| node.group_id.clone()) else {
            return false;
        };
        self.store
            .update_node(node_id, |node| node.position = position);
        match group_id {
            Some(group_id) => settle_group_members(&mut self.store, &group_id),
            None => settle_top_level(&mut self.store),
        }
        self.commit();
        true
    }

    /// The slice of the graph shown in `mode`.
    pub fn projection(&mut self, mode: ViewMode) -> Projection {
        let plugins = self.plugins.list_all();
        project(
            self.store.state(),
            mode,
            &plugins,
            &mut self.complete_layout,
            self.layout_timeout,
        )
    }

    /// Whether the complete-architecture layout is still being computed; the
    /// complete projection shows grid positions meanwhile.
    pub fn is_complete_layout_pending(&self) -> bool {
        self.complete_layout.is_pending()
    }

    /// Blocks until the complete-architecture layout finished or timed out.
    pub fn wait_for_complete_layout(&mut self) {
        let plugins = self.plugins.list_all();
        self.complete_layout
            .positions_for(&plugins, self.layout_timeout);
        self.complete_layout.wait();
    }

    pub fn current_projection(&mut self) -> Projection {
        let mode = self.store.state().view_mode;
        self.projection(mode)
    }

    /// Scans the workspace for manifests; lookups during the scan still resolve
    /// files through their nearest manifest.
    pub async fn initialize_plugins(&mut self) {
        self.plugins.initialize(self.host.as_ref()).await;
        self.complete_layout.invalidate();
    }
}
