//! Application services: sessions, posts, drafts, settings and schema setup.

pub mod auth;
pub mod drafts;
pub mod error;
pub mod lifecycle;
pub mod posts;
pub mod repos;
pub mod settings;
