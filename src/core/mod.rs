//! Core module containing the error types, naming rules and bound values
//! shared by every layer

pub mod error;
pub mod naming;
pub mod value;

pub use error::{
    ConfigError, ConversionError, ExecutionError, QueryError, SchemaError, SqlGraphError,
    SqlGraphResult,
};
pub use naming::{Pluralizer, snake_case};
pub use value::SqlValue;
