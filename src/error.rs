use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid storage configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Incompatible table: {0}")]
    IncompatibleTable(String),

    #[error("Empty query")]
    EmptyQuery,

    #[error("Destructive operation '{0}' not allowed")]
    DestructiveOperation(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Connection test failed")]
    ConnectionTestFailed,

    #[error("Query execution failed after {elapsed_ms}ms: {message}")]
    Execution { elapsed_ms: u64, message: String },

    #[error("Engine capability '{0}' is unavailable")]
    CapabilityUnavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Request timed out after {0} seconds")]
    RequestTimeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status class for the error. Caller and configuration problems are
    /// 400, gateway-side problems are 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidConfiguration(_)
            | Error::IncompatibleTable(_)
            | Error::EmptyQuery
            | Error::DestructiveOperation(_)
            | Error::InvalidRequest(_)
            | Error::ConnectionTestFailed
            | Error::Execution { .. } => 400,
            Error::RequestTimeout(_) => 504,
            Error::CapabilityUnavailable(_) | Error::Engine(_) | Error::Internal(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    pub fn with_context(self, operation: &str) -> Self {
        let context = format!("[op={}]", operation);

        match self {
            Error::Engine(msg) => Error::Engine(format!("{} {}", context, msg)),
            Error::Internal(msg) => Error::Internal(format!("{} {}", context, msg)),
            Error::CapabilityUnavailable(msg) => {
                Error::CapabilityUnavailable(format!("{} {}", context, msg))
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_configuration() {
        let err = Error::InvalidConfiguration("missing endpoint".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid storage configuration: missing endpoint"
        );
    }

    #[test]
    fn test_error_display_destructive_operation() {
        let err = Error::DestructiveOperation("DROP");
        assert_eq!(format!("{}", err), "Destructive operation 'DROP' not allowed");
    }

    #[test]
    fn test_error_display_empty_query() {
        assert_eq!(format!("{}", Error::EmptyQuery), "Empty query");
    }

    #[test]
    fn test_error_display_execution_includes_elapsed() {
        let err = Error::Execution {
            elapsed_ms: 42,
            message: "Catalog Error: Table not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("42ms"));
        assert!(text.contains("Table not found"));
    }

    #[test]
    fn test_status_code_client_errors() {
        assert_eq!(Error::InvalidConfiguration("x".into()).status_code(), 400);
        assert_eq!(Error::IncompatibleTable("x".into()).status_code(), 400);
        assert_eq!(Error::EmptyQuery.status_code(), 400);
        assert_eq!(Error::DestructiveOperation("DELETE").status_code(), 400);
        assert_eq!(Error::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(Error::ConnectionTestFailed.status_code(), 400);
        assert_eq!(
            Error::Execution {
                elapsed_ms: 0,
                message: "x".into()
            }
            .status_code(),
            400
        );
    }

    #[test]
    fn test_status_code_server_errors() {
        assert_eq!(Error::Internal("x".into()).status_code(), 500);
        assert_eq!(Error::Engine("x".into()).status_code(), 500);
        assert_eq!(Error::CapabilityUnavailable("iceberg".into()).status_code(), 500);
        assert_eq!(Error::RequestTimeout(30).status_code(), 504);
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::EmptyQuery.is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
        assert!(!Error::RequestTimeout(30).is_client_error());
    }

    #[test]
    fn test_with_context_engine() {
        let err = Error::Engine("connection refused".to_string());
        match err.with_context("preflight") {
            Error::Engine(msg) => {
                assert!(msg.contains("[op=preflight]"));
                assert!(msg.contains("connection refused"));
            }
            _ => panic!("Expected Engine variant"),
        }
    }

    #[test]
    fn test_with_context_passthrough_client_errors() {
        let err = Error::DestructiveOperation("DROP").with_context("query");
        assert!(matches!(err, Error::DestructiveOperation("DROP")));

        let err = Error::InvalidConfiguration("bad".into()).with_context("query");
        match err {
            Error::InvalidConfiguration(msg) => assert_eq!(msg, "bad"),
            _ => panic!("Expected InvalidConfiguration variant"),
        }
    }
}
