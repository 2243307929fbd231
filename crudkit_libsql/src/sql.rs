//! Statement assembly for the capability calls this adapter owns.
//!
//! Filters arrive as caller-supplied condition clauses with `?` placeholders;
//! the helpers here only wrap them with the SELECT/COUNT/DELETE scaffolding
//! and the LIMIT/OFFSET tail. A negative limit is passed through verbatim:
//! SQLite treats `LIMIT -1` as unbounded, which matches the pagination
//! sentinel.

use crudkit_core::{EntityMeta, Filter, Persistable};

fn where_clause(filter: &Filter) -> String {
    if filter.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filter.clause())
    }
}

fn pagination_tail(offset: i64, limit: i64) -> String {
    if offset < 0 && limit < 0 {
        return String::new();
    }
    // OFFSET requires a LIMIT clause in SQLite; -1 keeps it unbounded.
    let mut tail = format!(" LIMIT {}", limit);
    if offset >= 0 {
        tail.push_str(&format!(" OFFSET {}", offset));
    }
    tail
}

/// `SELECT <cols> FROM <table> [WHERE ...] [LIMIT ... [OFFSET ...]]`
pub fn select_where<E>(filter: &Filter, offset: i64, limit: i64) -> String
where
    E: EntityMeta,
{
    let cols = E::column_names().join(", ");
    format!(
        "SELECT {cols} FROM {table}{cond}{tail}",
        cols = cols,
        table = E::TABLE,
        cond = where_clause(filter),
        tail = pagination_tail(offset, limit),
    )
}

/// `SELECT COUNT(*) FROM <table> [WHERE ...]`
pub fn count_where<E>(filter: &Filter) -> String
where
    E: EntityMeta,
{
    format!(
        "SELECT COUNT(*) FROM {table}{cond}",
        table = E::TABLE,
        cond = where_clause(filter),
    )
}

/// `DELETE FROM <table> [WHERE ...]`
pub fn delete_where<E>(filter: &Filter) -> String
where
    E: EntityMeta,
{
    format!(
        "DELETE FROM {table}{cond}",
        table = E::TABLE,
        cond = where_clause(filter),
    )
}

/// `INSERT INTO <table> (<cols>) VALUES (?, ...)`, excluding the key column.
pub fn insert<E>() -> String
where
    E: EntityMeta + Persistable,
{
    let cols = E::INSERT_COLUMNS;
    let phs = vec!["?"; cols.len()].join(", ");
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = E::TABLE,
        cols = cols.join(", "),
        vals = phs,
    )
}

/// Upsert by primary key:
/// `INSERT INTO <table> (<all cols>) VALUES (?, ...) ON CONFLICT(<pk>) DO UPDATE SET <col> = excluded.<col>, ...`
pub fn upsert<E>(pk_column: &str) -> String
where
    E: EntityMeta + Persistable,
{
    let cols = E::column_names();
    let phs = vec!["?"; cols.len()].join(", ");
    let assignments: Vec<String> = cols
        .iter()
        .filter(|c| **c != pk_column)
        .map(|c| format!("{col} = excluded.{col}", col = c))
        .collect();
    let action = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", assignments.join(", "))
    };
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals}) ON CONFLICT({pk}) {action}",
        table = E::TABLE,
        cols = cols.join(", "),
        vals = phs,
        pk = pk_column,
        action = action,
    )
}
