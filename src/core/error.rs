//! Typed error handling for sqlgraph
//!
//! Every layer owns a small error enum so callers can match on the exact
//! failure instead of inspecting strings. [`SqlGraphError`] aggregates them.
//!
//! # Error Categories
//!
//! - [`SchemaError`]: SDL could not be turned into a schema (fatal at startup)
//! - [`QueryError`]: the request document or operation selection is unusable
//! - [`ExecutionError`]: a single field failed; downgraded to `null` by the executor
//! - [`ConversionError`]: a GraphQL selection could not be lowered to SQL
//! - [`ConfigError`]: mapping configuration could not be loaded or validated
//!
//! # Example
//!
//! ```rust,ignore
//! match converter.convert_to_select(&info) {
//!     Ok(result) => run(result.sql, result.params).await,
//!     Err(ConversionError::InvalidArgument { argument, message }) => {
//!         eprintln!("bad {argument}: {message}");
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use crate::sql::options::SqlValidationError;
use thiserror::Error;

/// The main error type for the crate
#[derive(Debug, Error)]
pub enum SqlGraphError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SqlGraphError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SqlGraphError::Schema(e) => e.error_code(),
            SqlGraphError::Query(e) => e.error_code(),
            SqlGraphError::Execution(e) => e.error_code(),
            SqlGraphError::Conversion(e) => e.error_code(),
            SqlGraphError::Config(_) => "CONFIG_ERROR",
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors raised while building a [`crate::graphql::Schema`] from SDL
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema parse error: {message}")]
    Parse { message: String },

    #[error("type '{name}' is defined more than once")]
    DuplicateType { name: String },

    #[error("type '{name}' referenced by {referenced_by} is not defined")]
    UnknownType { name: String, referenced_by: String },

    #[error("invalid directive on {location}: {message}")]
    InvalidDirective { location: String, message: String },
}

impl SchemaError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SchemaError::Parse { .. } => "SCHEMA_PARSE_ERROR",
            SchemaError::DuplicateType { .. } => "SCHEMA_DUPLICATE_TYPE",
            SchemaError::UnknownType { .. } => "SCHEMA_UNKNOWN_TYPE",
            SchemaError::InvalidDirective { .. } => "SCHEMA_INVALID_DIRECTIVE",
        }
    }
}

// =============================================================================
// Query Errors
// =============================================================================

/// Request-level failures. These abort the request before any field runs.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query parse error: {message}")]
    Parse { message: String },

    #[error("document does not contain any operation")]
    NoOperation,

    #[error("document contains {count} operations, an operation name is required")]
    OperationNameRequired { count: usize },

    #[error("unknown operation named '{name}'")]
    UnknownOperation { name: String },

    #[error("{kind} operations are not supported")]
    UnsupportedOperation { kind: String },

    #[error("schema does not define a {kind} root type")]
    MissingRootType { kind: String },
}

impl QueryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::Parse { .. } => "GRAPHQL_PARSE_FAILED",
            QueryError::NoOperation
            | QueryError::OperationNameRequired { .. }
            | QueryError::UnknownOperation { .. } => "GRAPHQL_INVALID_OPERATION",
            QueryError::UnsupportedOperation { .. } => "GRAPHQL_UNSUPPORTED_OPERATION",
            QueryError::MissingRootType { .. } => "GRAPHQL_VALIDATION_FAILED",
        }
    }
}

// =============================================================================
// Execution Errors
// =============================================================================

/// A failure localized to one field of the response
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Resolver(anyhow::Error),

    #[error("Cannot query field \"{field}\" on type \"{type_name}\"")]
    UnknownField { type_name: String, field: String },

    #[error("operation timed out before field could be resolved")]
    Timeout,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("failed to serialize scalar {scalar}: {message}")]
    Scalar { scalar: String, message: String },
}

impl ExecutionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecutionError::Resolver(_) => "RESOLVER_ERROR",
            ExecutionError::UnknownField { .. } => "GRAPHQL_VALIDATION_FAILED",
            ExecutionError::Timeout => "TIMEOUT",
            ExecutionError::Cancelled => "CANCELLED",
            ExecutionError::Scalar { .. } => "SCALAR_SERIALIZATION_ERROR",
        }
    }
}

impl From<anyhow::Error> for ExecutionError {
    fn from(err: anyhow::Error) -> Self {
        // Resolvers may bubble a typed error through anyhow; keep its identity.
        match err.downcast::<ExecutionError>() {
            Ok(typed) => typed,
            Err(err) => ExecutionError::Resolver(err),
        }
    }
}

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors raised while lowering a selection to SQL
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("resolve info for field '{field}' has no return type")]
    MissingReturnType { field: String },

    #[error("unknown GraphQL type '{name}'")]
    UnknownType { name: String },

    #[error("dialect '{dialect}' does not support {capability}")]
    UnsupportedCapability {
        dialect: String,
        capability: String,
    },

    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("generated SQL failed validation: {}", format_findings(.0))]
    Validation(Vec<SqlValidationError>),
}

fn format_findings(findings: &[SqlValidationError]) -> String {
    findings
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConversionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConversionError::MissingReturnType { .. } => "CONVERSION_MISSING_RETURN_TYPE",
            ConversionError::UnknownType { .. } => "CONVERSION_UNKNOWN_TYPE",
            ConversionError::UnsupportedCapability { .. } => "CONVERSION_UNSUPPORTED",
            ConversionError::InvalidArgument { .. } => "CONVERSION_INVALID_ARGUMENT",
            ConversionError::InvalidInput { .. } => "CONVERSION_INVALID_INPUT",
            ConversionError::Validation(_) => "SQL_VALIDATION_FAILED",
        }
    }

    pub(crate) fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        ConversionError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors related to loading the mapping configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid key '{key}' in {section}: {message}")]
    InvalidKey {
        section: String,
        key: String,
        message: String,
    },

    #[error("unsupported SQL dialect '{name}'")]
    UnsupportedDialect { name: String },
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for sqlgraph operations
pub type SqlGraphResult<T> = Result<T, SqlGraphError>;
