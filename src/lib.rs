//! Records how a developer moves through a plugin-based codebase and lays the
//! journey out as a graph of files grouped by plugin.

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod layout;
pub mod model;
pub mod plugins;
pub mod projection;
pub mod tracker;
pub mod util;
pub mod viewer;

pub use error::{GraphError, Result};
