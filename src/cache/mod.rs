//! Key-value cache for nuxtpress.
//!
//! The key-value store holds three kinds of data under one namespace:
//!
//! - **Snapshots** of relational reads (`blog_posts_list`, `blog_post:*`,
//!   `slug_exists:*`), always safe to delete;
//! - **State** that only lives here (`admin_session:*`, `setting:*`,
//!   `blog_draft:*`);
//! - the **migration marker** (`migration_version`).
//!
//! Snapshots are invalidated by the post writers via [`InvalidationPlan`].

mod config;
mod invalidation;
mod keys;
mod store;

pub use config::CacheConfig;
pub use invalidation::{InvalidationOutcome, InvalidationPlan, Invalidator, PostWrite};
pub use keys::{KeySpace, KvFamily, KvKey};
pub use store::CacheStore;
