//! Backend for a single-author blog.
//!
//! Posts live in Postgres; sessions, drafts, site settings and read-through
//! snapshots live in a key-value store that post writes keep consistent.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
