mod index;
mod locate;
mod manifest;

pub use index::PluginIndex;
pub use locate::PluginLocator;
pub use manifest::{PluginInfo, parse_manifest, relax_json};
