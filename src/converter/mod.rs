//! Lowering of GraphQL selections and mutation inputs to parameterized SQL
//!
//! A [`SqlConverter`] is configured once (type to table mappings, column
//! overrides, relation joins) and then shared by every request. Each
//! conversion call owns a fresh [`ParamMarshaler`], so the returned
//! parameter list always lines up with the placeholders in the SQL text.
//!
//! ```rust,ignore
//! let converter = SqlConverter::from_schema(schema.clone(), Arc::new(PostgresDialect))
//!     .pluralize_tables(true);
//!
//! let select = converter.convert_to_select(&params.info)?;
//! let rows = store.query(&select.sql, &select.params).await?;
//! ```

pub mod filter;
pub mod joins;

pub use filter::{FilterBuilder, OrderByBuilder, QueryArguments};
pub use joins::{JoinConfig, ThroughTable};

use crate::config::MappingConfig;
use crate::core::error::{ConfigError, ConversionError};
use crate::core::naming::{Pluralizer, snake_case};
use crate::core::value::SqlValue;
use crate::graphql::collector::{SelectedField, SelectionSet};
use crate::graphql::resolver::ResolveInfo;
use crate::graphql::schema::{Schema, TypeKind};
use crate::sql::ast::JoinKind;
use crate::sql::dialect::{Dialect, StatementBuilder};
use crate::sql::marshal::ParamMarshaler;
use crate::sql::options::{
    ConflictAction, DeleteOptions, InsertOptions, JoinClause, LateralSubquery, OnConflict,
    SelectOptions, SqlValidationError, UpdateOptions,
};
use joins::AliasAllocator;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Generated SELECT statement
#[derive(Debug, Clone)]
pub struct SelectResult {
    pub sql: String,
    /// `params[i]` is bound to placeholder `$i+1`
    pub params: Vec<SqlValue>,
    pub options: SelectOptions,
    /// Validation findings; the statement is generated regardless
    pub findings: Vec<SqlValidationError>,
}

impl SelectResult {
    /// Turn validation findings into an error
    pub fn ensure_valid(self) -> Result<Self, ConversionError> {
        if self.findings.is_empty() {
            Ok(self)
        } else {
            Err(ConversionError::Validation(self.findings))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutationKind::Insert => "INSERT",
            MutationKind::Update => "UPDATE",
            MutationKind::Delete => "DELETE",
        })
    }
}

/// Generated INSERT, UPDATE or DELETE statement
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub kind: MutationKind,
}

/// Compiles selections and mutation inputs to SQL for one dialect
pub struct SqlConverter {
    schema: Arc<Schema>,
    dialect: Arc<dyn Dialect>,
    tables: HashMap<String, String>,
    columns: HashMap<(String, String), String>,
    joins: HashMap<String, JoinConfig>,
    derived_joins: HashMap<String, JoinConfig>,
    derive_relations: bool,
    pluralize_tables: bool,
}

impl SqlConverter {
    /// A converter without any relation joins
    pub fn new(schema: Arc<Schema>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            schema,
            dialect,
            tables: HashMap::new(),
            columns: HashMap::new(),
            joins: HashMap::new(),
            derived_joins: HashMap::new(),
            derive_relations: false,
            pluralize_tables: false,
        }
    }

    /// A converter that joins every field annotated with `@sql(relation: ...)`
    ///
    /// Joins set with [`SqlConverter::configure_join`] take precedence.
    pub fn from_schema(schema: Arc<Schema>, dialect: Arc<dyn Dialect>) -> Self {
        let mut converter = Self::new(schema, dialect);
        converter.derive_relations = true;
        converter.refresh_derived_joins();
        converter
    }

    /// A schema-derived converter with the mappings of a loaded configuration
    pub fn from_config(schema: Arc<Schema>, config: &MappingConfig) -> Result<Self, ConfigError> {
        let mut converter = Self::from_schema(schema, config.dialect()?)
            .pluralize_tables(config.naming.pluralize_tables);

        for (type_name, table) in &config.models {
            converter = converter.map_type_to_table(type_name, table);
        }
        for (key, column) in &config.fields {
            let (type_name, field) = split_field_key("fields", key)?;
            converter = converter.map_field_to_column(type_name, field, column);
        }
        for (key, relation) in &config.relations {
            let (type_name, field) = split_field_key("relations", key)?;
            converter = converter.configure_join(type_name, field, relation.to_join_config());
        }

        tracing::debug!(
            tables = converter.tables.len(),
            columns = converter.columns.len(),
            joins = converter.joins.len() + converter.derived_joins.len(),
            "converter configured"
        );
        Ok(converter)
    }

    pub fn map_type_to_table(mut self, type_name: &str, table: &str) -> Self {
        self.tables.insert(type_name.to_string(), table.to_string());
        self.refresh_derived_joins();
        self
    }

    pub fn map_field_to_column(mut self, type_name: &str, field_name: &str, column: &str) -> Self {
        self.columns
            .insert((type_name.to_string(), field_name.to_string()), column.to_string());
        self
    }

    pub fn configure_join(mut self, type_name: &str, field_name: &str, join: JoinConfig) -> Self {
        self.joins.insert(join_key(type_name, field_name), join);
        self
    }

    /// Pluralize default table names (`BlogPost` → `blog_posts`)
    pub fn pluralize_tables(mut self, enabled: bool) -> Self {
        self.pluralize_tables = enabled;
        self.refresh_derived_joins();
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Table backing a GraphQL type
    pub fn table_name(&self, type_name: &str) -> String {
        if let Some(table) = self.tables.get(type_name) {
            return table.clone();
        }
        let table = snake_case(type_name);
        if self.pluralize_tables {
            Pluralizer::pluralize(&table)
        } else {
            table
        }
    }

    /// Column backing a GraphQL field: explicit mapping, `@sql(column:)`, then snake_case
    pub fn column_name(&self, type_name: &str, field_name: &str) -> String {
        if let Some(column) = self
            .columns
            .get(&(type_name.to_string(), field_name.to_string()))
        {
            return column.clone();
        }
        self.schema
            .field(type_name, field_name)
            .and_then(|field| field.sql_column.clone())
            .unwrap_or_else(|| snake_case(field_name))
    }

    pub fn join_config(&self, type_name: &str, field_name: &str) -> Option<&JoinConfig> {
        let key = join_key(type_name, field_name);
        self.joins.get(&key).or_else(|| self.derived_joins.get(&key))
    }

    fn refresh_derived_joins(&mut self) {
        if !self.derive_relations {
            return;
        }
        let mut derived = HashMap::new();
        for object in self.schema.object_types() {
            for field in object.fields.values() {
                let Some(relation) = field.sql_relation else {
                    continue;
                };
                let target_table = field
                    .sql_table
                    .clone()
                    .unwrap_or_else(|| self.table_name(field.field_type.named_type()));
                derived.insert(
                    join_key(&object.name, &field.name),
                    JoinConfig::derive(&object.name, field, relation, target_table),
                );
            }
        }
        self.derived_joins = derived;
    }

    // =========================================================================
    // SELECT
    // =========================================================================

    /// Compile the selection of a resolving field into a SELECT
    ///
    /// The field's return type picks the table. Scalar sub-fields become
    /// columns, relation sub-fields become joins, and the field's arguments
    /// become WHERE, ORDER BY and LIMIT/OFFSET.
    pub fn convert_to_select(&self, info: &ResolveInfo) -> Result<SelectResult, ConversionError> {
        let return_type = info
            .return_type
            .as_ref()
            .ok_or_else(|| ConversionError::MissingReturnType {
                field: info.field_name().to_string(),
            })?;
        let type_name = return_type.named_type();
        if !matches!(
            self.schema.type_kind(type_name),
            Some(TypeKind::Object | TypeKind::Interface)
        ) {
            return Err(ConversionError::UnknownType {
                name: type_name.to_string(),
            });
        }
        let builder = self.statement_builder()?;

        let alias = joins::initial(type_name);
        let mut marshaler = ParamMarshaler::new(self.dialect.as_ref());
        let mut build = SelectBuild {
            options: SelectOptions {
                alias: Some(alias.clone()),
                ..SelectOptions::new(self.table_name(type_name))
            },
            aliases: AliasAllocator::new(&alias),
        };

        if let Some(selections) = info.selections() {
            self.collect_selection(&mut build, &mut marshaler, type_name, &alias, selections, None)?;
        }

        let arguments = self.arguments_with_defaults(&info.parent_type, &info.field);
        let column = |field: &str| self.qualified_column(type_name, Some(&alias), field);
        let parsed = QueryArguments::parse(&arguments, &column, &mut marshaler)?;
        self.check_pagination(parsed.limit, parsed.offset)?;

        let options = &mut build.options;
        options.where_conditions.extend(parsed.where_conditions);
        options.order_by = parsed.order_by;
        options.limit = parsed.limit;
        options.offset = parsed.offset;

        let (sql, findings) = builder.build_select(&build.options);
        let params = marshaler.into_params();

        if !findings.is_empty() {
            tracing::warn!(
                table = %build.options.table,
                findings = findings.len(),
                first = %findings[0],
                "generated SELECT failed validation"
            );
        }
        tracing::debug!(sql = %sql, params = params.len(), "converted selection to SQL");

        Ok(SelectResult {
            sql,
            params,
            options: build.options,
            findings,
        })
    }

    /// Add the columns and joins of one selection set
    ///
    /// `prefix` is the join alias of a joined to-one relation; its columns
    /// are aliased `<prefix>_<responseKey>` so they stay distinct.
    fn collect_selection(
        &self,
        build: &mut SelectBuild,
        marshaler: &mut ParamMarshaler<'_>,
        type_name: &str,
        alias: &str,
        selections: &SelectionSet,
        prefix: Option<&str>,
    ) -> Result<(), ConversionError> {
        for field in selections.iter() {
            if let Some(join) = self.join_config(type_name, &field.name) {
                let Some(children) = field.selections.as_deref() else {
                    continue;
                };
                let target_type = self
                    .schema
                    .field(type_name, &field.name)
                    .map(|def| def.field_type.named_type().to_string())
                    .unwrap_or_default();
                let join_alias = build.aliases.allocate(field.response_key());

                if join.is_lateral() {
                    let lateral = LateralJoin {
                        parent_type: type_name,
                        parent_alias: alias,
                        target_type: &target_type,
                        join_alias: &join_alias,
                        field,
                        join,
                    };
                    self.lateral_join(build, marshaler, lateral, children)?;
                } else {
                    let q = |ident: &str| self.dialect.quote_identifier(ident);
                    build.options.joins.push(JoinClause {
                        kind: join.join_kind,
                        table: join.target_table.clone(),
                        alias: join_alias.clone(),
                        on: format!(
                            "{}.{} = {}.{}",
                            alias,
                            q(&join.source_column),
                            join_alias,
                            q(&join.target_column)
                        ),
                        subquery: None,
                    });
                    self.collect_selection(build, marshaler, &target_type, &join_alias, children, Some(&join_alias))?;
                }
                continue;
            }

            if field.has_selections() {
                tracing::debug!(
                    type_name = %type_name,
                    field = %field.name,
                    "object field without a join is left to its resolver"
                );
                continue;
            }

            let column = self.qualified_column(type_name, Some(alias), &field.name);
            let rendered = match (prefix, &field.alias) {
                (Some(prefix), _) => format!(
                    "{} AS {}",
                    column,
                    self.dialect
                        .quote_identifier(&format!("{}_{}", prefix, field.response_key()))
                ),
                (None, Some(response_alias)) if *response_alias != field.name => {
                    format!("{} AS {}", column, self.dialect.quote_identifier(response_alias))
                }
                (None, _) => column,
            };
            build.options.columns.push(rendered);
        }
        Ok(())
    }

    /// Fetch a to-many relation through `LEFT JOIN LATERAL (...) alias ON TRUE`
    ///
    /// The subquery carries the correlation with the parent row plus the
    /// relation field's own filter, ordering and pagination arguments.
    fn lateral_join(
        &self,
        build: &mut SelectBuild,
        marshaler: &mut ParamMarshaler<'_>,
        lateral: LateralJoin<'_>,
        children: &SelectionSet,
    ) -> Result<(), ConversionError> {
        let LateralJoin {
            parent_type,
            parent_alias,
            target_type,
            join_alias,
            field,
            join,
        } = lateral;
        let q = |ident: &str| self.dialect.quote_identifier(ident);
        let target_table = q(&join.target_table);

        let (qualifier, from, correlation) = match &join.through {
            None => (
                None,
                String::new(),
                format!(
                    "{} = {}.{}",
                    q(&join.target_column),
                    parent_alias,
                    q(&join.source_column)
                ),
            ),
            Some(link) => {
                let link_table = q(&link.table);
                (
                    Some(target_table.clone()),
                    format!(
                        "{} INNER JOIN {} ON {}.{} = {}.{}",
                        target_table,
                        link_table,
                        link_table,
                        q(&link.target_key),
                        target_table,
                        q(&join.target_column)
                    ),
                    format!(
                        "{}.{} = {}.{}",
                        link_table,
                        q(&link.source_key),
                        parent_alias,
                        q(&join.source_column)
                    ),
                )
            }
        };

        let mut columns: Vec<String> = Vec::new();
        for child in children.iter() {
            if child.has_selections() || self.join_config(target_type, &child.name).is_some() {
                tracing::debug!(
                    relation = %field.name,
                    field = %child.name,
                    "nested relation inside a lateral subquery is left to its resolver"
                );
                continue;
            }
            let column = self.column_name(target_type, &child.name);
            let inner = self.qualified_column(target_type, qualifier.as_deref(), &child.name);
            if !columns.contains(&inner) {
                columns.push(inner);
            }
            build.options.columns.push(format!(
                "{}.{} AS {}",
                join_alias,
                q(&column),
                q(&format!("{}_{}", join_alias, child.response_key()))
            ));
        }

        let arguments = self.arguments_with_defaults(parent_type, field);
        let column = |name: &str| self.qualified_column(target_type, qualifier.as_deref(), name);
        let parsed = QueryArguments::parse(&arguments, &column, marshaler)?;
        self.check_pagination(parsed.limit, parsed.offset)?;

        let mut where_conditions = vec![correlation];
        where_conditions.extend(parsed.where_conditions);

        let (kind, on) = match join.join_kind {
            JoinKind::Inner => (JoinKind::Lateral, String::new()),
            _ => (JoinKind::LeftLateral, "TRUE".to_string()),
        };
        build.options.joins.push(JoinClause {
            kind,
            table: join.target_table.clone(),
            alias: join_alias.to_string(),
            on,
            subquery: Some(LateralSubquery {
                columns,
                from,
                where_conditions,
                order_by: parsed.order_by,
                limit: parsed.limit,
                offset: parsed.offset,
            }),
        });
        Ok(())
    }

    // =========================================================================
    // INSERT / UPDATE / DELETE
    // =========================================================================

    /// `INSERT INTO table (...) VALUES (...)` from an input object
    pub fn convert_to_insert(
        &self,
        type_name: &str,
        input: &Map<String, Value>,
        returning: &[&str],
    ) -> Result<MutationResult, ConversionError> {
        self.insert_statement(type_name, input, None, returning)
    }

    /// INSERT with `ON CONFLICT (conflict columns)`
    ///
    /// With `update` set, the remaining input columns are overwritten from
    /// `EXCLUDED`; otherwise, or when nothing remains, the row is skipped.
    pub fn convert_to_upsert(
        &self,
        type_name: &str,
        input: &Map<String, Value>,
        conflict_fields: &[&str],
        update: bool,
        returning: &[&str],
    ) -> Result<MutationResult, ConversionError> {
        if !self.dialect.supports_upsert() {
            return Err(self.unsupported("ON CONFLICT"));
        }
        if conflict_fields.is_empty() {
            return Err(ConversionError::InvalidInput {
                message: "upsert needs at least one conflict field".to_string(),
            });
        }

        let conflict_columns: Vec<String> = conflict_fields
            .iter()
            .map(|field| self.dialect.quote_identifier(&self.column_name(type_name, field)))
            .collect();
        let set: Vec<(String, String)> = if update {
            input
                .keys()
                .map(|field| self.dialect.quote_identifier(&self.column_name(type_name, field)))
                .filter(|column| !conflict_columns.contains(column))
                .map(|column| {
                    let excluded = format!("EXCLUDED.{}", column);
                    (column, excluded)
                })
                .collect()
        } else {
            Vec::new()
        };

        let action = if set.is_empty() {
            ConflictAction::DoNothing
        } else {
            ConflictAction::DoUpdate {
                set,
                where_conditions: Vec::new(),
            }
        };
        let conflict = OnConflict {
            columns: conflict_columns,
            action,
        };
        self.insert_statement(type_name, input, Some(conflict), returning)
    }

    fn insert_statement(
        &self,
        type_name: &str,
        input: &Map<String, Value>,
        on_conflict: Option<OnConflict>,
        returning: &[&str],
    ) -> Result<MutationResult, ConversionError> {
        if input.is_empty() {
            return Err(ConversionError::InvalidInput {
                message: format!("INSERT into {} needs at least one field", type_name),
            });
        }
        let builder = self.statement_builder()?;
        let returning = self.returning_columns(type_name, returning)?;

        let mut marshaler = ParamMarshaler::new(self.dialect.as_ref());
        let mut columns = Vec::with_capacity(input.len());
        let mut values = Vec::with_capacity(input.len());
        for (field, value) in input {
            columns.push(self.dialect.quote_identifier(&self.column_name(type_name, field)));
            values.push(marshaler.marshal(value));
        }

        let options = InsertOptions {
            table: self.table_name(type_name),
            columns,
            values: vec![values],
            on_conflict,
            returning,
        };
        Ok(self.finish_mutation(MutationKind::Insert, builder.build_insert(&options), marshaler))
    }

    /// `UPDATE table alias SET ... WHERE filter`
    ///
    /// SET values are bound before the filter operands, in input order.
    pub fn convert_to_update(
        &self,
        type_name: &str,
        set: &Map<String, Value>,
        filter: &Value,
        returning: &[&str],
    ) -> Result<MutationResult, ConversionError> {
        if set.is_empty() {
            return Err(ConversionError::InvalidInput {
                message: format!("UPDATE of {} needs at least one field to set", type_name),
            });
        }
        let builder = self.statement_builder()?;
        let returning = self.returning_columns(type_name, returning)?;
        let alias = joins::initial(type_name);

        let mut marshaler = ParamMarshaler::new(self.dialect.as_ref());
        let assignments = set
            .iter()
            .map(|(field, value)| {
                let column = self.dialect.quote_identifier(&self.column_name(type_name, field));
                (column, marshaler.marshal(value))
            })
            .collect();
        let where_conditions = self.mutation_filter(type_name, &alias, filter, &mut marshaler)?;
        if where_conditions.is_empty() {
            tracing::warn!(type_name = %type_name, "UPDATE without a filter affects every row");
        }

        let options = UpdateOptions {
            table: self.table_name(type_name),
            alias: Some(alias),
            set: assignments,
            where_conditions,
            returning,
            ..Default::default()
        };
        Ok(self.finish_mutation(MutationKind::Update, builder.build_update(&options), marshaler))
    }

    /// `DELETE FROM table alias WHERE filter`
    pub fn convert_to_delete(
        &self,
        type_name: &str,
        filter: &Value,
        returning: &[&str],
    ) -> Result<MutationResult, ConversionError> {
        let builder = self.statement_builder()?;
        let returning = self.returning_columns(type_name, returning)?;
        let alias = joins::initial(type_name);

        let mut marshaler = ParamMarshaler::new(self.dialect.as_ref());
        let where_conditions = self.mutation_filter(type_name, &alias, filter, &mut marshaler)?;
        if where_conditions.is_empty() {
            tracing::warn!(type_name = %type_name, "DELETE without a filter affects every row");
        }

        let options = DeleteOptions {
            table: self.table_name(type_name),
            alias: Some(alias),
            where_conditions,
            returning,
            ..Default::default()
        };
        Ok(self.finish_mutation(MutationKind::Delete, builder.build_delete(&options), marshaler))
    }

    fn mutation_filter(
        &self,
        type_name: &str,
        alias: &str,
        filter: &Value,
        marshaler: &mut ParamMarshaler<'_>,
    ) -> Result<Vec<String>, ConversionError> {
        let column = |field: &str| self.qualified_column(type_name, Some(alias), field);
        let condition = FilterBuilder::new("where", &column, marshaler).build(filter)?;
        Ok(condition.into_iter().collect())
    }

    fn finish_mutation(&self, kind: MutationKind, sql: String, marshaler: ParamMarshaler<'_>) -> MutationResult {
        let params = marshaler.into_params();
        tracing::debug!(kind = %kind, sql = %sql, params = params.len(), "converted mutation to SQL");
        MutationResult { sql, params, kind }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn statement_builder(&self) -> Result<&dyn StatementBuilder, ConversionError> {
        self.dialect
            .statement_builder()
            .ok_or_else(|| self.unsupported("statement building"))
    }

    fn unsupported(&self, capability: &str) -> ConversionError {
        ConversionError::UnsupportedCapability {
            dialect: self.dialect.name().to_string(),
            capability: capability.to_string(),
        }
    }

    fn returning_columns(&self, type_name: &str, fields: &[&str]) -> Result<Vec<String>, ConversionError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        if !self.dialect.supports_returning() {
            return Err(self.unsupported("RETURNING"));
        }
        Ok(fields
            .iter()
            .map(|field| self.dialect.quote_identifier(&self.column_name(type_name, field)))
            .collect())
    }

    fn check_pagination(&self, limit: Option<u64>, offset: Option<u64>) -> Result<(), ConversionError> {
        if (limit.is_some() || offset.is_some()) && !self.dialect.supports_limit_offset() {
            return Err(self.unsupported("LIMIT/OFFSET"));
        }
        Ok(())
    }

    /// `qualifier."column"`, or just `"column"`
    fn qualified_column(&self, type_name: &str, qualifier: Option<&str>, field: &str) -> String {
        let column = self
            .dialect
            .quote_identifier(&self.column_name(type_name, field));
        match qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, column),
            None => column,
        }
    }

    /// Field arguments with the schema's declared defaults filled in
    fn arguments_with_defaults(&self, parent_type: &str, field: &SelectedField) -> Map<String, Value> {
        let mut arguments = field.arguments.clone();
        if let Some(definition) = self.schema.field(parent_type, &field.name) {
            for argument in &definition.arguments {
                if arguments.contains_key(&argument.name) {
                    continue;
                }
                if let Some(default) = &argument.default_value {
                    arguments.insert(argument.name.clone(), default.clone());
                }
            }
        }
        arguments
    }
}

/// Per-call state of a SELECT conversion
struct SelectBuild {
    options: SelectOptions,
    aliases: AliasAllocator,
}

/// A to-many relation being lowered to a lateral join
struct LateralJoin<'a> {
    parent_type: &'a str,
    parent_alias: &'a str,
    target_type: &'a str,
    join_alias: &'a str,
    field: &'a SelectedField,
    join: &'a JoinConfig,
}

fn join_key(type_name: &str, field_name: &str) -> String {
    format!("{}.{}", type_name, field_name)
}

fn split_field_key<'k>(section: &str, key: &'k str) -> Result<(&'k str, &'k str), ConfigError> {
    key.split_once('.').ok_or_else(|| ConfigError::InvalidKey {
        section: section.to_string(),
        key: key.to_string(),
        message: "expected `Type.field`".to_string(),
    })
}
