mod persist;
mod store;
mod types;

pub use persist::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{GraphStore, STATE_KEY};
pub use types::{
    DEPENDENCY_EDGE_PREFIX, EdgeType, FileNode, GROUP_ID_PREFIX, GraphState, GroupNode, GroupType,
    NavigationEdge, Position, SymbolRef, ViewMode, dependency_edge_id, group_id_for,
    push_unique_symbol,
};
