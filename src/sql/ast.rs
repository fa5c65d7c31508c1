//! Closed set of SQL constructs the dialect layer knows how to render

use serde::{Deserialize, Serialize};

/// Kind of join between two relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// `CROSS JOIN LATERAL`
    Lateral,
    /// `LEFT JOIN LATERAL`
    LeftLateral,
}

impl JoinKind {
    /// Joins that can produce NULL-extended rows
    pub fn is_outer(self) -> bool {
        matches!(
            self,
            JoinKind::Left | JoinKind::Right | JoinKind::Full | JoinKind::LeftLateral
        )
    }

    pub fn is_lateral(self) -> bool {
        matches!(self, JoinKind::Lateral | JoinKind::LeftLateral)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,

    // String matching
    Like,
    ILike,
    NotLike,
    NotILike,
    SimilarTo,
    RegexMatch,
    RegexIMatch,

    // JSON
    JsonGet,
    JsonGetText,
    JsonPath,
    JsonPathText,
    JsonContains,
    JsonContainedBy,

    // Array
    ArrayContains,
    ArrayOverlap,
    Concat,
}

/// Unary operators, prefix or postfix depending on the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    Exists,
    NotExists,
}

impl UnaryOp {
    /// Postfix operators follow their operand (`x IS NULL`)
    pub fn is_postfix(self) -> bool {
        matches!(
            self,
            UnaryOp::IsNull | UnaryOp::IsNotNull | UnaryOp::IsTrue | UnaryOp::IsFalse
        )
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Parse a GraphQL direction argument (`ASC`, `desc`, ...)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ASC" => Some(OrderDirection::Asc),
            "DESC" => Some(OrderDirection::Desc),
            _ => None,
        }
    }
}

/// Placement of NULLs in an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}
