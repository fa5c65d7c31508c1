//! Relation join configuration

use crate::core::naming::snake_case;
use crate::graphql::schema::{FieldDefinition, RelationKind};
use crate::sql::ast::JoinKind;
use std::collections::HashSet;

/// Link table of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughTable {
    pub table: String,
    /// Link column pointing at the source row
    pub source_key: String,
    /// Link column pointing at the target row
    pub target_key: String,
}

/// How a relation field joins its target table
///
/// `source_column` lives on the parent's table and `target_column` on the
/// target table. Many-to-many relations compare both against the link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub relation: RelationKind,
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
    pub join_kind: JoinKind,
    pub through: Option<ThroughTable>,
}

impl JoinConfig {
    pub fn new(
        relation: RelationKind,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            relation,
            target_table: target_table.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
            join_kind: JoinKind::Left,
            through: None,
        }
    }

    pub fn join_kind(mut self, kind: JoinKind) -> Self {
        self.join_kind = kind;
        self
    }

    pub fn through(mut self, through: ThroughTable) -> Self {
        self.through = Some(through);
        self
    }

    /// Whether the relation is fetched through a correlated lateral subquery
    pub fn is_lateral(&self) -> bool {
        self.relation.is_to_many()
    }

    /// Conventional join for a field annotated with `@sql(relation: ...)`
    ///
    /// - hasMany / hasOne: `source.id = target.<parent>_id`
    /// - belongsTo: `source.<field>_id = target.id`
    /// - manyToMany: both primary keys, through `<parent>_<target table>`
    pub fn derive(
        parent_type: &str,
        field: &FieldDefinition,
        relation: RelationKind,
        target_table: String,
    ) -> Self {
        let parent = snake_case(parent_type);
        match relation {
            RelationKind::HasMany | RelationKind::HasOne => {
                JoinConfig::new(relation, target_table, "id", format!("{}_id", parent))
            }
            RelationKind::BelongsTo => JoinConfig::new(
                relation,
                target_table,
                format!("{}_id", snake_case(&field.name)),
                "id",
            ),
            RelationKind::ManyToMany => {
                let target = snake_case(field.field_type.named_type());
                let link = ThroughTable {
                    table: format!("{}_{}", parent, target_table),
                    source_key: format!("{}_id", parent),
                    target_key: format!("{}_id", target),
                };
                JoinConfig::new(relation, target_table, "id", "id").through(link)
            }
        }
    }
}

/// Hands out unique table aliases within one statement
pub(crate) struct AliasAllocator {
    taken: HashSet<String>,
}

impl AliasAllocator {
    /// `root` is the alias of the statement's main table
    pub fn new(root: &str) -> Self {
        let mut taken = HashSet::new();
        taken.insert(root.to_string());
        Self { taken }
    }

    /// First lowercase letter of `name`, numbered from 2 on collision
    pub fn allocate(&mut self, name: &str) -> String {
        let base = initial(name);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Single-letter alias derived from a name
pub(crate) fn initial(name: &str) -> String {
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase().to_string())
        .unwrap_or_else(|| "t".to_string())
}
