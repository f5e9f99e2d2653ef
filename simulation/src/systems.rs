//! Systems - run against the world each frame
//!
//! Membership changes made by systems are intentions; they land at the next
//! flush.

pub mod collision;
pub mod movement;
pub mod streaming;
pub mod update;

pub use collision::{is_colliding_with, scan as collision_scan};
pub use movement::move_entity;
pub use streaming::{on_chunk_traverse, set_loaded_radius, traverse};
pub use update::update_system;
