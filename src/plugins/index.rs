use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{info, warn};
use tokio::sync::Mutex;

use super::locate::PluginLocator;
use super::manifest::{PluginInfo, parse_manifest};
use crate::config::Settings;
use crate::host::Host;

#[derive(Debug, Default)]
struct Entries {
    by_runtime: HashMap<String, PluginInfo>,
    by_package: HashMap<String, PluginInfo>,
}

impl Entries {
    fn insert(&mut self, info: PluginInfo) {
        self.by_runtime
            .insert(info.runtime_id.to_lowercase(), info.clone());
        self.by_runtime.insert(info.runtime_id.clone(), info.clone());
        if !info.package_id.is_empty() {
            self.by_package.insert(info.package_id.clone(), info);
        }
    }
}

/// Lookup from plugin identifiers to their manifest data. Constructed once per
/// session and shared by reference.
#[derive(Debug)]
pub struct PluginIndex {
    manifest_glob: String,
    exclude_glob: String,
    scan_limit: usize,
    entries: RwLock<Entries>,
    initialized: Mutex<bool>,
    locator: PluginLocator,
}

impl PluginIndex {
    pub fn new(workspace_root: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            manifest_glob: settings.manifest_glob(),
            exclude_glob: settings.exclude_glob.clone(),
            scan_limit: settings.manifest_scan_limit,
            entries: RwLock::new(Entries::default()),
            initialized: Mutex::new(false),
            locator: PluginLocator::new(workspace_root, settings.manifest_file_name.clone()),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        self.locator.root()
    }

    /// Scans the workspace once. Concurrent callers wait for the scan in flight
    /// and then return without scanning again.
    pub async fn initialize(&self, host: &dyn Host) {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return;
        }

        let manifests = match host
            .find_files(&self.manifest_glob, Some(&self.exclude_glob), self.scan_limit)
            .await
        {
            Ok(paths) => paths,
            Err(error) => {
                warn!("manifest scan failed: {error}");
                return;
            }
        };

        let mut scanned = Vec::with_capacity(manifests.len());
        for path in &manifests {
            let text = match host.read_document(path).await {
                Ok(text) => text,
                Err(error) => {
                    warn!("cannot read {}: {error}", path.display());
                    continue;
                }
            };
            match parse_manifest(&text, path) {
                Ok(Some(plugin)) => scanned.push(plugin),
                Ok(None) => {}
                Err(error) => warn!("skipping manifest: {error}"),
            }
        }

        if let Ok(mut entries) = self.entries.write() {
            for plugin in scanned {
                entries.insert(plugin);
            }
            info!(
                "indexed {} plugins from {} manifests",
                distinct_runtime_ids(&entries),
                manifests.len()
            );
        }
        *initialized = true;
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    /// Forgets everything so the next `initialize` rescans.
    pub async fn clear(&self) {
        let mut initialized = self.initialized.lock().await;
        if let Ok(mut entries) = self.entries.write() {
            *entries = Entries::default();
        }
        self.locator.clear();
        *initialized = false;
    }

    /// Exact runtime id first, then its lowercase form.
    pub fn lookup_by_runtime_id(&self, id: &str) -> Option<PluginInfo> {
        let entries = self.entries.read().ok()?;
        entries
            .by_runtime
            .get(id)
            .or_else(|| entries.by_runtime.get(&id.to_lowercase()))
            .cloned()
    }

    pub fn lookup_by_package_id(&self, id: &str) -> Option<PluginInfo> {
        self.entries.read().ok()?.by_package.get(id).cloned()
    }

    pub fn directory_of(&self, id: &str) -> Option<PathBuf> {
        self.lookup_by_runtime_id(id)
            .or_else(|| self.lookup_by_package_id(id))
            .map(|plugin| plugin.directory)
    }

    /// One entry per runtime id, ordered by runtime id.
    pub fn list_all(&self) -> Vec<PluginInfo> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };
        entries
            .by_runtime
            .values()
            .map(|plugin| (plugin.runtime_id.clone(), plugin.clone()))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect()
    }

    /// Owning plugin of `file` via the local manifest walk. Usable before
    /// `initialize` finishes; hits are added to the index.
    pub fn locate(&self, file: &Path) -> Option<PluginInfo> {
        let plugin = self.locator.locate(file)?;
        if let Ok(mut entries) = self.entries.write()
            && !entries.by_runtime.contains_key(&plugin.runtime_id)
        {
            entries.insert(plugin.clone());
        }
        Some(plugin)
    }

    /// Adds an entry directly, bypassing the scan.
    pub fn register(&self, plugin: PluginInfo) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(plugin);
        }
    }
}

fn distinct_runtime_ids(entries: &Entries) -> usize {
    let mut ids = entries
        .by_runtime
        .values()
        .map(|plugin| plugin.runtime_id.as_str())
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
