use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("IDENTIFIER_REGEX pattern is valid")
});

/// Statement keywords that mutate state, checked in this order.
pub const DENIED_KEYWORDS: [&str; 6] = ["DELETE", "DROP", "INSERT", "UPDATE", "CREATE", "ALTER"];

pub fn validate_identifier(name: &str) -> Result<()> {
    if name.len() > 128 || !IDENTIFIER_REGEX.is_match(name) {
        return Err(Error::InvalidRequest(format!(
            "Invalid identifier: {}",
            name
        )));
    }
    Ok(())
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Lexical guard for the read-only query surface.
///
/// This is a case-insensitive substring scan, not a parser: identifiers such
/// as `update_count` or `created_at` are rejected too, and keywords inside
/// string literals or comments count. Empty input is reported before the
/// deny-list runs.
pub fn check_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(Error::EmptyQuery);
    }

    let upper = sql.to_uppercase();
    match DENIED_KEYWORDS.iter().find(|kw| upper.contains(**kw)) {
        Some(keyword) => Err(Error::DestructiveOperation(*keyword)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_simple() {
        assert!(validate_identifier("analytics").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("db.schema").is_ok());
    }

    #[test]
    fn test_validate_identifier_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("123ns").is_err());
        assert!(validate_identifier("ns-name").is_err());
        assert!(validate_identifier("ns'; DROP TABLE x; --").is_err());
        assert!(validate_identifier(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("events"), "\"events\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("s3://lake/events"), "'s3://lake/events'");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_check_sql_select_allowed() {
        assert!(check_sql("SELECT 1").is_ok());
        assert!(check_sql("select count(*) from read_parquet('s3://movies/data/**/*.parquet')").is_ok());
    }

    #[test]
    fn test_check_sql_empty() {
        assert!(matches!(check_sql(""), Err(Error::EmptyQuery)));
        assert!(matches!(check_sql("   \n\t"), Err(Error::EmptyQuery)));
    }

    #[test]
    fn test_check_sql_drop_rejected() {
        assert!(matches!(
            check_sql("DROP TABLE x"),
            Err(Error::DestructiveOperation("DROP"))
        ));
    }

    #[test]
    fn test_check_sql_case_insensitive() {
        assert!(matches!(
            check_sql("delete from t"),
            Err(Error::DestructiveOperation("DELETE"))
        ));
        assert!(matches!(
            check_sql("Insert Into t Values (1)"),
            Err(Error::DestructiveOperation("INSERT"))
        ));
    }

    #[test]
    fn test_check_sql_each_keyword() {
        for keyword in DENIED_KEYWORDS {
            let sql = format!("{} something", keyword.to_lowercase());
            match check_sql(&sql) {
                Err(Error::DestructiveOperation(found)) => assert_eq!(found, keyword),
                other => panic!("Expected rejection for {}, got {:?}", keyword, other),
            }
        }
    }

    #[test]
    fn test_check_sql_reports_first_keyword_in_deny_list_order() {
        // DROP appears first in the text, DELETE first in the deny-list.
        assert!(matches!(
            check_sql("DROP TABLE a; DELETE FROM b"),
            Err(Error::DestructiveOperation("DELETE"))
        ));
    }

    // Pinned false positives: substring matching rejects column names and
    // literals that merely contain a keyword.

    #[test]
    fn test_check_sql_false_positive_column_name() {
        assert!(matches!(
            check_sql("SELECT DROP_COUNT FROM t"),
            Err(Error::DestructiveOperation("DROP"))
        ));
        assert!(matches!(
            check_sql("SELECT update_count FROM t"),
            Err(Error::DestructiveOperation("UPDATE"))
        ));
        assert!(matches!(
            check_sql("SELECT created_at FROM t"),
            Err(Error::DestructiveOperation("CREATE"))
        ));
    }

    #[test]
    fn test_check_sql_false_positive_string_literal() {
        assert!(matches!(
            check_sql("SELECT * FROM t WHERE note = 'please delete me'"),
            Err(Error::DestructiveOperation("DELETE"))
        ));
    }

    #[test]
    fn test_check_sql_false_positive_comment() {
        assert!(matches!(
            check_sql("SELECT 1 -- alter later"),
            Err(Error::DestructiveOperation("ALTER"))
        ));
    }
}
