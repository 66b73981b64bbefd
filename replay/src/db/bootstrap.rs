use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection},
    ConnectOptions, Connection, Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// MySQL caps identifier length at 64 characters.
const MAX_IDENTIFIER_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid {kind} {value:?}: only letters, digits and underscores are allowed")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The idempotent statement that creates the API database.
///
/// Identifiers cannot be bound as query parameters, so every name is checked
/// against a strict character set before it is interpolated.
pub fn create_database_statement(config: &DatabaseConfig) -> Result<String, BootstrapError> {
    let name = validate_identifier("database name", &config.name)?;
    let charset = validate_identifier("character set", &config.charset)?;
    let collation = validate_identifier("collation", &config.collation)?;
    Ok(format!(
        "CREATE DATABASE IF NOT EXISTS `{}` CHARACTER SET {} COLLATE {}",
        name, charset, collation
    ))
}

fn validate_identifier<'a>(kind: &'static str, value: &'a str) -> Result<&'a str, BootstrapError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(BootstrapError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Connects without selecting a database, since it may not exist yet.
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlConnection, BootstrapError> {
    info!(host = %config.host, port = config.port, user = %config.user, "acquiring mysql connection");
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password);
    Ok(options.connect().await?)
}

/// Creates the database if it does not exist. Safe to run repeatedly.
pub async fn create_database(config: &DatabaseConfig) -> Result<(), BootstrapError> {
    let statement = create_database_statement(config)?;
    let mut connection = connect(config).await?;
    (&mut connection).execute(statement.as_str()).await?;
    info!(database = %config.name, "database ensured");
    connection.close().await?;
    Ok(())
}
