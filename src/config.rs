//! Configuration from the environment

use std::env::var;

/// Storage configuration
pub enum StorageConfig {
    /// Detect configuration from environment
    ///
    /// The Postgres storage reads `DATABASE_URL`, the memory storage needs nothing
    DetectConfig,

    /// Use existing connection
    #[cfg(feature = "postgres")]
    ExistingConnection(sqlx::PgPool),
}

/// Get the value of ENV var, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    if let Ok(value) = var(var_name)
        && !value.is_empty()
    {
        return value;
    }

    or_else()
}

/// Get the value of an ENV var that has to be there
///
/// # Errors
///
/// Will return `Err` when the variable is not set or empty
pub fn required_env_var(var_name: &'static str) -> anyhow::Result<String> {
    match var(var_name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(anyhow::anyhow!("`{var_name}` is not set")),
    }
}
