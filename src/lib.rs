#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Tag alias requests
//!
//! A user asks for one tag to be aliased to another. The request validates the proposed
//! [`TagAlias`](tag_aliases::TagAlias), optionally opens a [`ForumTopic`](forum_topics::ForumTopic)
//! to discuss it and persists both in a single transaction.

use tracing_subscriber::prelude::*;

pub use config::StorageConfig;
pub use tag_alias_request::Error;
pub use tag_alias_request::TagAliasRequest;
pub use tag_alias_request::TagAliasRequestForm;

pub mod config;
pub mod forum_topics;
pub mod storage;
pub mod tag_alias_request;
pub mod tag_aliases;
#[cfg(test)]
mod tests;
pub mod truthy;

const DEFAULT_RUST_LOG: &str = "tag_alias_request=debug";

/// Load the `.env` file, if there is one
pub fn setup_environment() {
    dotenvy::dotenv().ok();
}

/// Install the global tracing subscriber
///
/// Uses `RUST_LOG` when set, otherwise logs this crate at debug level
pub fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(config::env_var_or_else("RUST_LOG", || {
            DEFAULT_RUST_LOG.into()
        })))
        .with(fmt::layer())
        .init();
}

/// Setup the storage
///
/// # Errors
///
/// Will return `Err` when the configured database can not be reached or migrated
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup_storage(_config: StorageConfig) -> anyhow::Result<storage::Memory> {
    Ok(storage::Memory::new())
}

/// Setup the storage
///
/// # Errors
///
/// Will return `Err` when the configured database can not be reached or migrated
#[cfg(feature = "postgres")]
pub async fn setup_storage(config: StorageConfig) -> anyhow::Result<storage::Database> {
    storage::Database::from_config(config).await
}
