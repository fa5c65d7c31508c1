//! PostgreSQL dialect

use super::{Dialect, StatementBuilder};
use crate::sql::ast::{BinaryOp, JoinKind, NullsOrder, OrderDirection, UnaryOp};
use crate::sql::options::{
    ConflictAction, DeleteOptions, InsertOptions, JoinClause, LateralSubquery, OrderByColumn,
    SelectOptions, SqlValidationError, UpdateOptions,
};

/// PostgreSQL: every feature flag is on and all statements can be assembled
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Quote a possibly schema-qualified name part by part
    fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn format_order_by(&self, order_by: &[OrderByColumn]) -> String {
        order_by
            .iter()
            .map(|o| {
                let mut item = format!("{} {}", o.column, self.format_order_direction(o.direction));
                if let Some(nulls) = o.nulls {
                    item.push(' ');
                    item.push_str(self.format_nulls_order(nulls));
                }
                item
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn format_assignments(&self, set: &[(String, String)]) -> String {
        set.iter()
            .map(|(column, value)| format!("{} = {}", column, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn write_join(&self, sql: &mut String, join: &JoinClause) {
        sql.push('\n');
        sql.push_str(self.format_join_kind(join.kind));
        sql.push(' ');

        match &join.subquery {
            Some(sub) => self.write_subquery(sql, sub, &join.table),
            None => sql.push_str(&self.quote_qualified(&join.table)),
        }
        sql.push(' ');
        sql.push_str(&join.alias);

        if !join.on.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }
    }

    fn write_subquery(&self, sql: &mut String, sub: &LateralSubquery, table: &str) {
        let columns = if sub.columns.is_empty() {
            "*".to_string()
        } else {
            sub.columns.join(", ")
        };
        let from = if sub.from.is_empty() {
            self.quote_qualified(table)
        } else {
            sub.from.clone()
        };

        sql.push_str("(\n    SELECT ");
        sql.push_str(&columns);
        sql.push_str("\n    FROM ");
        sql.push_str(&from);
        if !sub.where_conditions.is_empty() {
            sql.push_str("\n    WHERE ");
            sql.push_str(&sub.where_conditions.join(" AND "));
        }
        if !sub.order_by.is_empty() {
            sql.push_str("\n    ORDER BY ");
            sql.push_str(&self.format_order_by(&sub.order_by));
        }
        if let Some(limit) = sub.limit {
            sql.push_str(&format!("\n    LIMIT {}", limit));
        }
        if let Some(offset) = sub.offset {
            sql.push_str(&format!("\n    OFFSET {}", offset));
        }
        sql.push_str("\n)");
    }

    fn returning_clause(&self, returning: &[String]) -> String {
        if returning.is_empty() || !self.supports_returning() {
            String::new()
        } else {
            format!("\nRETURNING {}", returning.join(", "))
        }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn supports_returning(&self) -> bool {
        true
    }
    fn supports_upsert(&self) -> bool {
        true
    }
    fn supports_cte(&self) -> bool {
        true
    }
    fn supports_recursive_cte(&self) -> bool {
        true
    }
    fn supports_window_functions(&self) -> bool {
        true
    }
    fn supports_json(&self) -> bool {
        true
    }
    fn supports_arrays(&self) -> bool {
        true
    }
    fn supports_literal_join(&self) -> bool {
        true
    }
    fn supports_distinct_on(&self) -> bool {
        true
    }
    fn supports_limit_offset(&self) -> bool {
        true
    }
    fn supports_nulls_ordering(&self) -> bool {
        true
    }
    fn supports_row_locking(&self) -> bool {
        true
    }
    fn supports_materialized_cte(&self) -> bool {
        true
    }
    fn supports_full_outer_join(&self) -> bool {
        true
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    fn format_join_kind(&self, kind: JoinKind) -> &'static str {
        match kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Lateral => "CROSS JOIN LATERAL",
            JoinKind::LeftLateral => "LEFT JOIN LATERAL",
        }
    }

    fn format_order_direction(&self, direction: OrderDirection) -> &'static str {
        match direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }

    fn format_nulls_order(&self, nulls: NullsOrder) -> &'static str {
        match nulls {
            NullsOrder::First => "NULLS FIRST",
            NullsOrder::Last => "NULLS LAST",
        }
    }

    fn format_binary_op(&self, op: BinaryOp) -> &'static str {
        match op {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Like => "LIKE",
            BinaryOp::ILike => "ILIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::NotILike => "NOT ILIKE",
            BinaryOp::SimilarTo => "SIMILAR TO",
            BinaryOp::RegexMatch => "~",
            BinaryOp::RegexIMatch => "~*",
            BinaryOp::JsonGet => "->",
            BinaryOp::JsonGetText => "->>",
            BinaryOp::JsonPath => "#>",
            BinaryOp::JsonPathText => "#>>",
            BinaryOp::JsonContains => "@>",
            BinaryOp::JsonContainedBy => "<@",
            BinaryOp::ArrayContains => "@>",
            BinaryOp::ArrayOverlap => "&&",
            BinaryOp::Concat => "||",
        }
    }

    fn format_unary_op(&self, op: UnaryOp) -> &'static str {
        match op {
            UnaryOp::Not => "NOT",
            UnaryOp::Negate => "-",
            UnaryOp::IsNull => "IS NULL",
            UnaryOp::IsNotNull => "IS NOT NULL",
            UnaryOp::IsTrue => "IS TRUE",
            UnaryOp::IsFalse => "IS FALSE",
            UnaryOp::Exists => "EXISTS",
            UnaryOp::NotExists => "NOT EXISTS",
        }
    }

    fn format_bool_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn format_cast(&self, expr: &str, type_name: &str) -> String {
        format!("{}::{}", expr, type_name)
    }

    fn statement_builder(&self) -> Option<&dyn StatementBuilder> {
        Some(self)
    }
}

impl StatementBuilder for PostgresDialect {
    fn build_select(&self, opts: &SelectOptions) -> (String, Vec<SqlValidationError>) {
        let findings = opts.validate();
        let mut sql = String::from("SELECT ");

        if !opts.distinct_on.is_empty() {
            sql.push_str(&format!("DISTINCT ON ({}) ", opts.distinct_on.join(", ")));
        }
        if opts.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&opts.columns.join(", "));
        }

        sql.push_str("\nFROM ");
        sql.push_str(&self.quote_qualified(&opts.table));
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(alias);
        }

        for join in &opts.joins {
            self.write_join(&mut sql, join);
        }

        if !opts.where_conditions.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&opts.where_conditions.join("\n  AND "));
        }
        if !opts.group_by.is_empty() {
            sql.push_str("\nGROUP BY ");
            sql.push_str(&opts.group_by.join(", "));
        }
        if !opts.having.is_empty() {
            sql.push_str("\nHAVING ");
            sql.push_str(&opts.having.join(" AND "));
        }
        if !opts.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&self.format_order_by(&opts.order_by));
        }
        if let Some(limit) = opts.limit {
            sql.push_str(&format!("\nLIMIT {}", limit));
        }
        if let Some(offset) = opts.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        if opts.for_update {
            sql.push_str("\nFOR UPDATE");
            if !opts.for_update_of.is_empty() {
                sql.push_str(" OF ");
                sql.push_str(&opts.for_update_of.join(", "));
            }
        }

        (sql, findings)
    }

    fn build_insert(&self, opts: &InsertOptions) -> String {
        let rows = opts
            .values
            .iter()
            .map(|row| format!("({})", row.join(", ")))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({})\nVALUES {}",
            self.quote_qualified(&opts.table),
            opts.columns.join(", "),
            rows
        );

        if let Some(conflict) = &opts.on_conflict {
            sql.push_str("\nON CONFLICT");
            if !conflict.columns.is_empty() {
                sql.push_str(&format!(" ({})", conflict.columns.join(", ")));
            }
            match &conflict.action {
                ConflictAction::DoNothing => sql.push_str(" DO NOTHING"),
                ConflictAction::DoUpdate {
                    set,
                    where_conditions,
                } => {
                    sql.push_str(" DO UPDATE SET ");
                    sql.push_str(&self.format_assignments(set));
                    if !where_conditions.is_empty() {
                        sql.push_str(" WHERE ");
                        sql.push_str(&where_conditions.join(" AND "));
                    }
                }
            }
        }

        sql.push_str(&self.returning_clause(&opts.returning));
        sql
    }

    fn build_update(&self, opts: &UpdateOptions) -> String {
        let mut sql = format!("UPDATE {}", self.quote_qualified(&opts.table));
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        sql.push_str("\nSET ");
        sql.push_str(&self.format_assignments(&opts.set));

        if !opts.from.is_empty() {
            sql.push_str("\nFROM ");
            sql.push_str(&opts.from.join(", "));
        }
        if !opts.where_conditions.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&opts.where_conditions.join(" AND "));
        }
        sql.push_str(&self.returning_clause(&opts.returning));
        sql
    }

    fn build_delete(&self, opts: &DeleteOptions) -> String {
        let mut sql = format!("DELETE FROM {}", self.quote_qualified(&opts.table));
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        if !opts.using.is_empty() {
            sql.push_str("\nUSING ");
            sql.push_str(&opts.using.join(", "));
        }
        if !opts.where_conditions.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&opts.where_conditions.join(" AND "));
        }
        sql.push_str(&self.returning_clause(&opts.returning));
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::options::OnConflict;

    #[test]
    fn test_quoting() {
        let pg = PostgresDialect;
        assert_eq!(pg.quote_identifier("user"), "\"user\"");
        assert_eq!(pg.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(pg.quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(pg.placeholder(3), "$3");
        assert_eq!(pg.format_cast("$1", "jsonb"), "$1::jsonb");
        assert_eq!(pg.format_bool_literal(false), "FALSE");
    }

    #[test]
    fn test_build_simple_select() {
        let opts = SelectOptions {
            columns: vec!["u.\"id\"".into(), "u.\"name\"".into()],
            alias: Some("u".into()),
            where_conditions: vec!["u.\"age\" > $1".into(), "u.\"age\" < $2".into()],
            order_by: vec![
                OrderByColumn::new("u.\"name\"", OrderDirection::Desc).nulls(NullsOrder::Last),
            ],
            limit: Some(10),
            offset: Some(20),
            ..SelectOptions::new("users")
        };
        let (sql, findings) = PostgresDialect.build_select(&opts);
        assert!(findings.is_empty());
        assert_eq!(
            sql,
            "SELECT u.\"id\", u.\"name\"\nFROM \"users\" u\nWHERE u.\"age\" > $1\n  AND u.\"age\" < $2\nORDER BY u.\"name\" DESC NULLS LAST\nLIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_build_select_star_distinct_on_and_lock() {
        let opts = SelectOptions {
            distinct_on: vec!["a".into()],
            order_by: vec![OrderByColumn::new("a", OrderDirection::Asc)],
            for_update: true,
            for_update_of: vec!["t".into()],
            alias: Some("t".into()),
            ..SelectOptions::new("public.things")
        };
        let (sql, _) = PostgresDialect.build_select(&opts);
        assert_eq!(
            sql,
            "SELECT DISTINCT ON (a) *\nFROM \"public\".\"things\" t\nORDER BY a ASC\nFOR UPDATE OF t"
        );
    }

    #[test]
    fn test_build_select_with_lateral_join() {
        let opts = SelectOptions {
            columns: vec!["u.\"id\"".into(), "p.\"title\" AS \"p_title\"".into()],
            alias: Some("u".into()),
            joins: vec![JoinClause {
                kind: JoinKind::LeftLateral,
                table: "posts".into(),
                alias: "p".into(),
                on: "TRUE".into(),
                subquery: Some(LateralSubquery {
                    columns: vec!["\"title\"".into()],
                    where_conditions: vec!["\"posts\".\"user_id\" = u.\"id\"".into()],
                    limit: Some(2),
                    ..Default::default()
                }),
            }],
            ..SelectOptions::new("users")
        };
        let (sql, findings) = PostgresDialect.build_select(&opts);
        assert!(findings.is_empty());
        assert_eq!(
            sql,
            "SELECT u.\"id\", p.\"title\" AS \"p_title\"\nFROM \"users\" u\nLEFT JOIN LATERAL (\n    SELECT \"title\"\n    FROM \"posts\"\n    WHERE \"posts\".\"user_id\" = u.\"id\"\n    LIMIT 2\n) p ON TRUE"
        );
    }

    #[test]
    fn test_build_select_reports_findings_but_still_renders() {
        let opts = SelectOptions {
            having: vec!["count(*) > 1".into()],
            ..SelectOptions::new("t")
        };
        let (sql, findings) = PostgresDialect.build_select(&opts);
        assert_eq!(findings.len(), 1);
        assert_eq!(sql, "SELECT *\nFROM \"t\"\nHAVING count(*) > 1");
    }

    #[test]
    fn test_build_insert_with_conflict() {
        let opts = InsertOptions {
            table: "users".into(),
            columns: vec!["\"email\"".into(), "\"name\"".into()],
            values: vec![vec!["$1".into(), "$2".into()], vec!["$3".into(), "$4".into()]],
            on_conflict: Some(OnConflict {
                columns: vec!["\"email\"".into()],
                action: ConflictAction::DoUpdate {
                    set: vec![("\"name\"".into(), "EXCLUDED.\"name\"".into())],
                    where_conditions: vec![],
                },
            }),
            returning: vec!["\"id\"".into()],
        };
        assert_eq!(
            PostgresDialect.build_insert(&opts),
            "INSERT INTO \"users\" (\"email\", \"name\")\nVALUES ($1, $2), ($3, $4)\nON CONFLICT (\"email\") DO UPDATE SET \"name\" = EXCLUDED.\"name\"\nRETURNING \"id\""
        );
    }

    #[test]
    fn test_build_insert_do_nothing() {
        let opts = InsertOptions {
            table: "tags".into(),
            columns: vec!["\"name\"".into()],
            values: vec![vec!["$1".into()]],
            on_conflict: Some(OnConflict {
                columns: vec![],
                action: ConflictAction::DoNothing,
            }),
            returning: vec![],
        };
        assert_eq!(
            PostgresDialect.build_insert(&opts),
            "INSERT INTO \"tags\" (\"name\")\nVALUES ($1)\nON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_build_update_and_delete() {
        let update = UpdateOptions {
            table: "users".into(),
            alias: Some("u".into()),
            set: vec![
                ("\"name\"".into(), "$1".into()),
                ("\"age\"".into(), "$2".into()),
            ],
            from: vec!["\"teams\" t".into()],
            where_conditions: vec!["u.\"team_id\" = t.\"id\"".into(), "t.\"name\" = $3".into()],
            returning: vec!["u.\"id\"".into()],
        };
        assert_eq!(
            PostgresDialect.build_update(&update),
            "UPDATE \"users\" u\nSET \"name\" = $1, \"age\" = $2\nFROM \"teams\" t\nWHERE u.\"team_id\" = t.\"id\" AND t.\"name\" = $3\nRETURNING u.\"id\""
        );

        let delete = DeleteOptions {
            table: "users".into(),
            alias: Some("u".into()),
            using: vec!["\"bans\" b".into()],
            where_conditions: vec!["b.\"user_id\" = u.\"id\"".into()],
            returning: vec![],
        };
        assert_eq!(
            PostgresDialect.build_delete(&delete),
            "DELETE FROM \"users\" u\nUSING \"bans\" b\nWHERE b.\"user_id\" = u.\"id\""
        );
    }
}
