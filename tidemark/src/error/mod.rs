use thiserror::Error;

pub mod context;

pub type Result<T> = std::result::Result<T, Error>;

pub use context::{ErrorChain, ErrorContext};

/// Main error type for tidemark
#[derive(Error, Debug)]
pub enum Error {
    // Setup-time errors, recoverable by the caller
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("\"{0}\" is undefined in the configuration")]
    UndefinedConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown driver \"{identifier}\" (known drivers: {known})")]
    UnknownBackend { identifier: String, known: String },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    // Migration tree errors, raised before any database mutation
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Migration \"{name}\" has been tampered with, revert it before migrating")]
    Tampered { name: String },

    #[error("Migration not found: {0}")]
    MigrationNotFound(String),

    #[error("Pending migrations: {0}")]
    PendingMigrations(String),

    #[error("Cannot apply empty {0} batch")]
    EmptyBatch(String),

    // Database errors
    #[error("Query \"{label}\" failed{}: {message}", fmt_code(.code))]
    Query {
        label: String,
        code: Option<String>,
        message: String,
    },

    #[error("Database transaction error: {0}")]
    Transaction(String),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Failed to decode row: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

impl Error {
    pub fn missing_configuration(msg: impl Into<String>) -> Self {
        Self::MissingConfiguration(msg.into())
    }

    pub fn undefined_configuration(entry: impl Into<String>) -> Self {
        Self::UndefinedConfiguration(entry.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn database_connection(msg: impl Into<String>) -> Self {
        Self::DatabaseConnection(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Build a query error from a backend error, keeping the native error code
    pub fn query(label: impl Into<String>, err: &sqlx::Error) -> Self {
        let code = match err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        };
        let message = match err {
            sqlx::Error::Database(db_err) => db_err.message().to_string(),
            other => other.to_string(),
        };

        Self::Query {
            label: label.into(),
            code,
            message,
        }
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Nothing-to-do outcomes that callers report as success
    pub fn is_benign(&self) -> bool {
        match self {
            Error::EmptyBatch(_) => true,
            Error::WithContext { source, .. } => source.is_benign(),
            _ => false,
        }
    }

    /// Stable error code for callers and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MissingConfiguration(_) => "E_MISSING_CONFIGURATION",
            Error::UndefinedConfiguration(_) => "E_UNDEFINED_CONFIGURATION",
            Error::InvalidConfiguration(_) => "E_INVALID_CONFIGURATION",
            Error::UnknownBackend { .. } => "E_UNKNOWN_BACKEND",
            Error::MissingDependency(_) => "E_MISSING_DEPENDENCY",
            Error::Integrity(_) => "E_INTEGRITY",
            Error::Tampered { .. } => "E_TAMPERED",
            Error::MigrationNotFound(_) => "E_MIGRATION_NOT_FOUND",
            Error::PendingMigrations(_) => "E_PENDING_MIGRATIONS",
            Error::EmptyBatch(_) => "E_EMPTY_BATCH",
            Error::Query { .. } => "E_DB_QUERY",
            Error::Transaction(_) => "E_DB_TRANSACTION",
            Error::DatabaseConnection(_) => "E_DB_CONNECTION",
            Error::NotConnected(_) => "E_NOT_CONNECTED",
            Error::Decode(_) => "E_DECODE",
            Error::Io(_) => "E_IO",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }
}
