//! Schema introspection.
//!
//! All catalog queries go through [`QueryGateway::execute`] with the schema
//! and table names bound as parameters. Every selected column is cast to a
//! plain type so the rows decode the same way on any server version.

use crate::db::QueryGateway;
use crate::error::DbResult;
use crate::models::{
    CheckConstraint, ColumnDefinition, ForeignKey, IndexInfo, QueryParam, Row, TableSchema,
    UniqueConstraint,
};
use tracing::debug;

// =============================================================================
// SQL Query Templates
// =============================================================================

pub mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1
          AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            (is_nullable = 'YES') AS nullable,
            column_default::text AS column_default,
            character_maximum_length::int4 AS max_length,
            numeric_precision::int4 AS numeric_precision,
            numeric_scale::int4 AS numeric_scale
        FROM information_schema.columns
        WHERE table_schema = $1
          AND table_name = $2
        ORDER BY ordinal_position
    "#;

    pub const DESCRIBE_PRIMARY_KEYS: &str = r#"
        SELECT kcu.column_name::text AS column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
            AND tc.table_name = kcu.table_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
          AND tc.table_schema = $1
          AND tc.table_name = $2
        ORDER BY kcu.ordinal_position
    "#;

    pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            indexname::text AS index_name,
            indexdef::text AS definition
        FROM pg_indexes
        WHERE schemaname = $1
          AND tablename = $2
        ORDER BY indexname
    "#;

    pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            c.conname::text AS constraint_name,
            a.attname::text AS column_name,
            fns.nspname::text AS foreign_schema,
            ft.relname::text AS foreign_table,
            fa.attname::text AS foreign_column
        FROM pg_constraint c
        JOIN pg_class t ON t.oid = c.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_class ft ON ft.oid = c.confrelid
        JOIN pg_namespace fns ON fns.oid = ft.relnamespace
        CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord)
        JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
        JOIN pg_attribute fa ON fa.attrelid = c.confrelid AND fa.attnum = k.fattnum
        WHERE c.contype = 'f'
          AND n.nspname = $1
          AND t.relname = $2
        ORDER BY c.conname, k.ord
    "#;

    pub const DESCRIBE_UNIQUE_CONSTRAINTS: &str = r#"
        SELECT
            c.conname::text AS constraint_name,
            a.attname::text AS column_name
        FROM pg_constraint c
        JOIN pg_class t ON t.oid = c.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
        WHERE c.contype = 'u'
          AND n.nspname = $1
          AND t.relname = $2
        ORDER BY c.conname, k.ord
    "#;

    pub const DESCRIBE_CHECK_CONSTRAINTS: &str = r#"
        SELECT
            c.conname::text AS constraint_name,
            pg_get_constraintdef(c.oid)::text AS definition
        FROM pg_constraint c
        JOIN pg_class t ON t.oid = c.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        WHERE c.contype = 'c'
          AND n.nspname = $1
          AND t.relname = $2
        ORDER BY c.conname
    "#;
}

/// Schema inspector over any gateway.
pub struct SchemaInspector<'a, G> {
    gateway: &'a G,
}

impl<'a, G: QueryGateway> SchemaInspector<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Base tables in `schema`, ordered by name.
    pub async fn list_tables(&self, schema: &str) -> DbResult<Vec<String>> {
        let result = self
            .gateway
            .execute(queries::LIST_TABLES, &[QueryParam::from(schema)])
            .await?;
        Ok(result.column_strings("table_name"))
    }

    /// Columns, keys, indexes and constraints of one table, merged.
    ///
    /// A table that does not exist yields an empty description rather than
    /// an error.
    pub async fn describe_table(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> DbResult<TableSchema> {
        let params = [QueryParam::from(schema), QueryParam::from(table)];
        let gw = self.gateway;

        let columns = gw.execute(queries::DESCRIBE_COLUMNS, &params).await?;
        let primary_keys = gw.execute(queries::DESCRIBE_PRIMARY_KEYS, &params).await?;
        let indexes = gw.execute(queries::DESCRIBE_INDEXES, &params).await?;
        let foreign_keys = gw.execute(queries::DESCRIBE_FOREIGN_KEYS, &params).await?;
        let unique = gw.execute(queries::DESCRIBE_UNIQUE_CONSTRAINTS, &params).await?;
        let checks = gw.execute(queries::DESCRIBE_CHECK_CONSTRAINTS, &params).await?;

        let mut description = TableSchema::new(database, schema, table);
        description.columns = columns.rows.iter().map(parse_column).collect();
        description.primary_keys = primary_keys.column_strings("column_name");
        description.indexes = indexes.rows.iter().map(parse_index).collect();
        description.foreign_keys = foreign_keys.rows.iter().map(parse_foreign_key).collect();
        description.unique_constraints = group_unique(&unique.rows);
        description.check_constraints = checks.rows.iter().map(parse_check).collect();
        description.mark_primary_keys();

        debug!(
            table = %description.qualified_name(),
            columns = description.columns.len(),
            "Described table"
        );
        Ok(description)
    }
}

fn get_string(row: &Row, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

fn get_optional_string(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.as_str()).map(String::from)
}

fn get_optional_i64(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(|v| v.as_i64())
}

fn parse_column(row: &Row) -> ColumnDefinition {
    let nullable = row
        .get("nullable")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let mut column = ColumnDefinition::new(
        get_string(row, "column_name"),
        get_string(row, "data_type"),
        nullable,
    );
    column.default = get_optional_string(row, "column_default");
    column.max_length = get_optional_i64(row, "max_length");
    column.numeric_precision = get_optional_i64(row, "numeric_precision");
    column.numeric_scale = get_optional_i64(row, "numeric_scale");
    column
}

fn parse_index(row: &Row) -> IndexInfo {
    IndexInfo {
        name: get_string(row, "index_name"),
        definition: get_string(row, "definition"),
    }
}

fn parse_foreign_key(row: &Row) -> ForeignKey {
    ForeignKey {
        name: get_string(row, "constraint_name"),
        column: get_string(row, "column_name"),
        foreign_schema: get_string(row, "foreign_schema"),
        foreign_table: get_string(row, "foreign_table"),
        foreign_column: get_string(row, "foreign_column"),
    }
}

fn parse_check(row: &Row) -> CheckConstraint {
    CheckConstraint {
        name: get_string(row, "constraint_name"),
        definition: get_string(row, "definition"),
    }
}

/// Fold (constraint, column) rows into one entry per constraint.
/// Rows arrive ordered by constraint name, then key position.
fn group_unique(rows: &[Row]) -> Vec<UniqueConstraint> {
    let mut constraints: Vec<UniqueConstraint> = Vec::new();
    for row in rows {
        let name = get_string(row, "constraint_name");
        let column = get_string(row, "column_name");
        match constraints.last_mut() {
            Some(last) if last.name == name => last.columns.push(column),
            _ => constraints.push(UniqueConstraint {
                name,
                columns: vec![column],
            }),
        }
    }
    constraints
}
