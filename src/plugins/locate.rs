use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};

use super::manifest::{PluginInfo, parse_manifest};

/// Finds the plugin owning a file by walking up to the nearest manifest. Works
/// without a global scan; results are cached per directory.
#[derive(Debug)]
pub struct PluginLocator {
    root: PathBuf,
    manifest_file_name: String,
    cache: Mutex<HashMap<PathBuf, Option<PluginInfo>>>,
}

impl PluginLocator {
    pub fn new(root: impl Into<PathBuf>, manifest_file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            manifest_file_name: manifest_file_name.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cached(&self, dir: &Path) -> Option<Option<PluginInfo>> {
        self.cache.lock().ok()?.get(dir).cloned()
    }

    fn remember(&self, dirs: &[PathBuf], result: &Option<PluginInfo>) {
        if let Ok(mut cache) = self.cache.lock() {
            for dir in dirs {
                cache.insert(dir.clone(), result.clone());
            }
        }
    }

    /// Nearest plugin whose directory contains `file`, never looking above the
    /// workspace root. Manifests that fail to parse or are not plugins are skipped.
    pub fn locate(&self, file: &Path) -> Option<PluginInfo> {
        if !file.starts_with(&self.root) {
            return None;
        }

        let mut visited = Vec::new();
        let mut current = file.parent();
        let mut found = None;

        while let Some(dir) = current {
            if !dir.starts_with(&self.root) {
                break;
            }
            if let Some(hit) = self.cached(dir) {
                found = hit;
                break;
            }
            visited.push(dir.to_path_buf());

            let manifest = dir.join(&self.manifest_file_name);
            if manifest.is_file() {
                match std::fs::read_to_string(&manifest) {
                    Ok(text) => match parse_manifest(&text, &manifest) {
                        Ok(Some(info)) => {
                            debug!("{} belongs to plugin {}", file.display(), info.runtime_id);
                            found = Some(info);
                            break;
                        }
                        Ok(None) => {}
                        Err(error) => warn!("skipping manifest: {error}"),
                    },
                    Err(error) => warn!("cannot read {}: {error}", manifest.display()),
                }
            }

            if dir == self.root {
                break;
            }
            current = dir.parent();
        }

        self.remember(&visited, &found);
        found
    }
}
