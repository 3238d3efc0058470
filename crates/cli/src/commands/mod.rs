//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Errors shared by commands that need a database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Neither database variable is set.
    #[error("Missing environment variable: SHOPFLOOR_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The URL selects the in-memory store, which has nothing to migrate or seed.
    #[error("SHOPFLOOR_DATABASE_URL is \"memory\"; point it at PostgreSQL")]
    MemoryStore,
}

/// Resolve the database URL the API server would use.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("SHOPFLOOR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingDatabaseUrl)?;

    if url == shopfloor_api::config::MEMORY_DATABASE_URL {
        return Err(CommandError::MemoryStore);
    }
    Ok(SecretString::from(url))
}
