//! SQL intermediate representation, dialects and parameter marshaling

pub mod ast;
pub mod dialect;
pub mod marshal;
pub mod options;

pub use ast::{BinaryOp, JoinKind, NullsOrder, OrderDirection, UnaryOp};
pub use dialect::{Dialect, PostgresDialect, StatementBuilder, dialect_for_name};
pub use marshal::ParamMarshaler;
pub use options::{
    ConflictAction, DeleteOptions, InsertOptions, JoinClause, LateralSubquery, OnConflict,
    OrderByColumn, SelectOptions, SqlValidationError, UpdateOptions,
};
