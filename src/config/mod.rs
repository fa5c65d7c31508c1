//! Mapping configuration loading and validation
//!
//! A [`MappingConfig`] describes how GraphQL types map onto tables: table and
//! column names, relation joins, scalar coercions and executor limits. It is
//! normally loaded from YAML:
//!
//! ```yaml
//! database:
//!   dialect: postgresql
//! naming:
//!   pluralize_tables: true
//! models:
//!   User: app_users
//! fields:
//!   User.fullName: display_name
//! relations:
//!   User.posts: { type: hasMany, table: posts, foreignKey: author_id, references: id }
//! scalars:
//!   DateTime: { kind: string }
//! execution:
//!   timeout_ms: 5000
//! ```

use crate::converter::{JoinConfig, ThroughTable};
use crate::core::error::ConfigError;
use crate::graphql::dataloader::DataLoaderConfig;
use crate::graphql::schema::{RelationKind, ScalarMarshaler, Schema};
use crate::sql::ast::JoinKind;
use crate::sql::dialect::{Dialect, dialect_for_name};
use anyhow::{Result as AnyResult, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Complete mapping configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MappingConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,

    pub naming: NamingConfig,

    /// GraphQL type -> table
    #[validate(custom(function = "validate_models"))]
    pub models: HashMap<String, String>,

    /// `Type.field` -> column
    #[validate(custom(function = "validate_fields"))]
    pub fields: HashMap<String, String>,

    /// `Type.field` -> relation join
    #[validate(custom(function = "validate_relations"))]
    pub relations: HashMap<String, RelationConfig>,

    /// Custom scalar -> built-in coercion
    pub scalars: HashMap<String, ScalarConfig>,

    #[validate(nested)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "dialect cannot be empty"))]
    pub dialect: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: "postgresql".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Pluralize default table names
    pub pluralize_tables: bool,
}

/// Join of one relation field
///
/// For `hasMany`/`hasOne`, `foreignKey` is the column on the target table and
/// `references` the column on the source table. For `belongsTo` it is the
/// other way round. `manyToMany` points both at the primary keys and reaches
/// the target through the link table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub table: String,
    pub foreign_key: String,
    #[serde(default = "default_references")]
    pub references: String,
    #[serde(default)]
    pub join_type: JoinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<ThroughConfig>,
}

fn default_references() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughConfig {
    pub table: String,
    pub source_key: String,
    pub target_key: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Left,
    Inner,
    Right,
}

impl From<JoinType> for JoinKind {
    fn from(join_type: JoinType) -> Self {
        match join_type {
            JoinType::Left => JoinKind::Left,
            JoinType::Inner => JoinKind::Inner,
            JoinType::Right => JoinKind::Right,
        }
    }
}

impl RelationConfig {
    pub fn to_join_config(&self) -> JoinConfig {
        let (source, target) = match self.kind {
            RelationKind::BelongsTo => (&self.foreign_key, &self.references),
            _ => (&self.references, &self.foreign_key),
        };
        let mut join = JoinConfig::new(self.kind, &self.table, source, target)
            .join_kind(self.join_type.into());
        if let Some(through) = &self.through {
            join = join.through(ThroughTable {
                table: through.table.clone(),
                source_key: through.source_key.clone(),
                target_key: through.target_key.clone(),
            });
        }
        join
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarConfig {
    pub kind: ScalarKind,
}

/// Built-in coercions available to custom scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Boolean,
    Json,
}

/// Coerces a resolved leaf value into one JSON shape
#[derive(Debug, Clone, Copy)]
pub struct CoercingScalar(pub ScalarKind);

impl ScalarMarshaler for CoercingScalar {
    fn serialize(&self, value: &Value) -> AnyResult<Value> {
        let coerced = match (self.0, value) {
            (ScalarKind::Json, v) => v.clone(),
            (ScalarKind::String, Value::String(_)) => value.clone(),
            (ScalarKind::String, Value::Number(n)) => Value::String(n.to_string()),
            (ScalarKind::String, Value::Bool(b)) => Value::String(b.to_string()),
            (ScalarKind::Int, Value::Number(n)) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
                    _ => bail!("{} is not an integer", n),
                },
            },
            (ScalarKind::Int, Value::String(s)) => Value::from(s.trim().parse::<i64>()?),
            (ScalarKind::Float, Value::Number(n)) => match n.as_f64() {
                Some(f) => Value::from(f),
                None => bail!("{} is not a float", n),
            },
            (ScalarKind::Float, Value::String(s)) => Value::from(s.trim().parse::<f64>()?),
            (ScalarKind::Boolean, Value::Bool(_)) => value.clone(),
            (ScalarKind::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => bail!("\"{}\" is not a boolean", s),
            },
            (kind, other) => bail!("cannot coerce {} to {:?}", other, kind),
        };
        Ok(coerced)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Default per-request deadline
    #[validate(range(min = 1, message = "timeout_ms must be positive"))]
    pub timeout_ms: Option<u64>,

    #[validate(nested)]
    pub dataloader: DataLoaderSettings,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataLoaderSettings {
    #[validate(range(min = 1, max = 10000, message = "max_batch must be between 1 and 10000"))]
    pub max_batch: usize,
    pub batch_delay_ms: u64,
}

impl Default for DataLoaderSettings {
    fn default() -> Self {
        Self {
            max_batch: 100,
            batch_delay_ms: 1,
        }
    }
}

impl DataLoaderSettings {
    pub fn to_config(&self) -> DataLoaderConfig {
        DataLoaderConfig {
            max_batch: self.max_batch,
            delay: Duration::from_millis(self.batch_delay_ms),
        }
    }
}

impl MappingConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            models = config.models.len(),
            relations = config.relations.len(),
            "loaded mapping config"
        );
        Ok(config)
    }

    /// Load and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Dialect named by `database.dialect`
    pub fn dialect(&self) -> Result<Arc<dyn Dialect>, ConfigError> {
        dialect_for_name(&self.database.dialect)
    }

    /// Attach the configured coercions to the schema's scalars
    ///
    /// Returns the number of scalars registered.
    pub fn register_scalars(&self, schema: &Schema) -> usize {
        let mut registered = 0;
        for (name, scalar) in &self.scalars {
            if schema.get_scalar(name).is_none() {
                tracing::warn!(scalar = %name, "configured scalar is not declared in the schema");
                continue;
            }
            schema.register_scalar(name, Arc::new(CoercingScalar(scalar.kind)));
            registered += 1;
        }
        registered
    }

    /// Create a small blog configuration for testing
    pub fn default_config() -> Self {
        let mut relations = HashMap::new();
        relations.insert(
            "User.posts".to_string(),
            RelationConfig {
                kind: RelationKind::HasMany,
                table: "posts".to_string(),
                foreign_key: "user_id".to_string(),
                references: "id".to_string(),
                join_type: JoinType::Left,
                through: None,
            },
        );
        relations.insert(
            "Post.author".to_string(),
            RelationConfig {
                kind: RelationKind::BelongsTo,
                table: "users".to_string(),
                foreign_key: "user_id".to_string(),
                references: "id".to_string(),
                join_type: JoinType::Left,
                through: None,
            },
        );
        relations.insert(
            "Post.tags".to_string(),
            RelationConfig {
                kind: RelationKind::ManyToMany,
                table: "tags".to_string(),
                foreign_key: "id".to_string(),
                references: "id".to_string(),
                join_type: JoinType::Left,
                through: Some(ThroughConfig {
                    table: "post_tags".to_string(),
                    source_key: "post_id".to_string(),
                    target_key: "tag_id".to_string(),
                }),
            },
        );

        Self {
            naming: NamingConfig {
                pluralize_tables: true,
            },
            relations,
            ..Default::default()
        }
    }
}

// =============================================================================
// Validation helpers
// =============================================================================

fn identifier_regex() -> &'static Regex {
    static IDENT_REGEX: OnceLock<Regex> = OnceLock::new();
    IDENT_REGEX.get_or_init(|| {
        // optionally schema-qualified
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap()
    })
}

fn field_key_regex() -> &'static Regex {
    static FIELD_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    FIELD_KEY_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

fn check_identifier(key: &str, what: &str, ident: &str) -> Result<(), ValidationError> {
    if identifier_regex().is_match(ident) {
        Ok(())
    } else {
        Err(invalid(
            "sql_identifier",
            format!("{}: {} '{}' is not a valid SQL identifier", key, what, ident),
        ))
    }
}

fn check_field_key(key: &str) -> Result<(), ValidationError> {
    if field_key_regex().is_match(key) {
        Ok(())
    } else {
        Err(invalid("field_key", format!("'{}' must have the form Type.field", key)))
    }
}

fn validate_models(models: &HashMap<String, String>) -> Result<(), ValidationError> {
    models
        .iter()
        .try_for_each(|(type_name, table)| check_identifier(type_name, "table", table))
}

fn validate_fields(fields: &HashMap<String, String>) -> Result<(), ValidationError> {
    fields.iter().try_for_each(|(key, column)| {
        check_field_key(key)?;
        check_identifier(key, "column", column)
    })
}

fn validate_relations(relations: &HashMap<String, RelationConfig>) -> Result<(), ValidationError> {
    for (key, relation) in relations {
        check_field_key(key)?;
        check_identifier(key, "table", &relation.table)?;
        check_identifier(key, "foreignKey", &relation.foreign_key)?;
        check_identifier(key, "references", &relation.references)?;

        match (&relation.kind, &relation.through) {
            (RelationKind::ManyToMany, None) => {
                return Err(invalid(
                    "relation_through",
                    format!("{}: manyToMany relations need a through table", key),
                ));
            }
            (RelationKind::ManyToMany, Some(through)) => {
                check_identifier(key, "through.table", &through.table)?;
                check_identifier(key, "through.sourceKey", &through.source_key)?;
                check_identifier(key, "through.targetKey", &through.target_key)?;
            }
            (kind, Some(_)) => {
                return Err(invalid(
                    "relation_through",
                    format!("{}: only manyToMany relations take a through table, not {}", key, kind),
                ));
            }
            (_, None) => {}
        }
    }
    Ok(())
}
