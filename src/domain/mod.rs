//! Domain layer types and invariants.

pub mod entities;
pub mod permissions;
pub mod posts;
pub mod slug;
