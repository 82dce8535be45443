pub mod collision;
pub mod force;
mod forces;
pub mod groups;
mod quadtree;
pub mod worker;

pub use collision::{CollisionBox, CollisionConfig, resolve_collisions};
pub use force::{ForceParams, LayoutNode, force_layout, grid_layout, layout_or_grid};
pub use worker::{LayoutJob, spawn_layout};
