use serde_json::Value;
use tracing::{debug, warn};

use super::session::Session;
use crate::domain::ValidationOutcome;
use crate::error::{Error, Result};
use crate::metrics::record_incompatible_table;
use crate::validation::quote_literal;

/// Checks that the table at `table_path` only carries data manifests.
///
/// A delete manifest is a hard `IncompatibleTable` error. Metadata that
/// cannot be read yields a valid outcome with a warning.
pub fn validate_table(session: &Session, table_path: &str) -> Result<ValidationOutcome> {
    let sql = format!(
        "SELECT manifest_content FROM iceberg_metadata({})",
        quote_literal(table_path)
    );

    let metadata = match session.query(&sql) {
        Ok(result) => result,
        Err(e) => {
            warn!(table_path, error = %e, "Table metadata unreadable, skipping compatibility check");
            return Ok(ValidationOutcome::inconclusive(format!(
                "Could not verify table compatibility for {}: {}",
                table_path, e
            )));
        }
    };

    let delete_manifests = metadata
        .rows
        .iter()
        .filter_map(|row| row.first())
        .filter(|content| is_delete_manifest(content))
        .count();

    if delete_manifests > 0 {
        record_incompatible_table();
        return Err(Error::IncompatibleTable(format!(
            "{} contains {} delete manifest(s); only append-only tables are supported",
            table_path, delete_manifests
        )));
    }

    debug!(table_path, manifests = metadata.rows.len(), "Table is append-only");
    Ok(ValidationOutcome::valid())
}

fn is_delete_manifest(content: &Value) -> bool {
    match content {
        Value::String(s) => s.to_uppercase().contains("DELETE"),
        _ => false,
    }
}
