//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod posts;
pub mod settings;
pub mod slug;
pub mod timestamps;
