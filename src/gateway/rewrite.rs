//! Text-level query rewriting.
//!
//! Everything here is pattern matching over raw SQL, not parsing. Known blind
//! spots, pinned by the tests below:
//! - a `LIMIT` anywhere in the text (subquery, string literal, comment,
//!   identifier such as `limit_col`) suppresses row-limit injection;
//! - scan calls inside comments are rewritten too;
//! - only the first trailing `;` is removed, so multiple statements pass
//!   through and the cap lands on the last one.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::session::CATALOG_ALIAS;
use crate::domain::{CatalogTarget, QueryPlanFragment, RowLimit};
use crate::validation::{quote_identifier, quote_literal};

/// `read_parquet('<scheme>://<bucket>[/<path>]/**/*.parquet')`
static PARQUET_GLOB_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)read_parquet\s*\(\s*'([a-z][a-z0-9+.\-]*)://([^/'\s]+)(?:/([^'\s]+?))?/\*\*/\*\.parquet'\s*\)",
    )
    .expect("PARQUET_GLOB_SCAN pattern is valid")
});

static SIMPLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("SIMPLE_NAME pattern is valid")
});

/// Trims whitespace and drops one trailing statement terminator.
pub fn normalize(sql: &str) -> &str {
    let sql = sql.trim();
    sql.strip_suffix(';').map(str::trim_end).unwrap_or(sql)
}

/// Appends `LIMIT n` unless the text already mentions LIMIT in any case.
pub fn inject_row_limit(sql: &str, limit: RowLimit) -> String {
    let sql = normalize(sql);
    if sql.to_uppercase().contains("LIMIT") {
        sql.to_string()
    } else {
        format!("{} LIMIT {}", sql, limit)
    }
}

/// Replaces every Parquet glob scan with a table-format reference: a
/// catalog-qualified table when a catalog is attached, otherwise a direct
/// `iceberg_scan` of the table root. Text outside the matches is untouched.
pub fn rewrite_scan_references(sql: &str, catalog: Option<&CatalogTarget>) -> String {
    PARQUET_GLOB_SCAN
        .replace_all(sql, |caps: &Captures| {
            let scheme = &caps[1];
            let bucket = &caps[2];
            let path = caps
                .get(3)
                .map(|m| m.as_str().trim_end_matches('/'))
                .filter(|p| !p.is_empty());
            let root = match path {
                Some(path) => format!("{}://{}/{}", scheme, bucket, path),
                None => format!("{}://{}", scheme, bucket),
            };
            match catalog {
                Some(target) => catalog_reference(target, table_name(path.unwrap_or(bucket))),
                None => format!("iceberg_scan({})", quote_literal(&root)),
            }
        })
        .into_owned()
}

/// Row-limit injection followed by scan substitution. Never fails.
pub fn rewrite_query(
    fragment: &QueryPlanFragment,
    catalog: Option<&CatalogTarget>,
) -> QueryPlanFragment {
    let limited = fragment.with_sql(inject_row_limit(fragment.sql(), fragment.row_limit()));
    limited.with_sql(rewrite_scan_references(limited.sql(), catalog))
}

fn table_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn catalog_reference(target: &CatalogTarget, table: &str) -> String {
    let table = if SIMPLE_NAME.is_match(table) {
        table.to_string()
    } else {
        quote_identifier(table)
    };
    format!("{}.{}.{}", CATALOG_ALIAS, target.namespace, table)
}
