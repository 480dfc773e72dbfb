use serde::{Deserialize, Serialize};

use crate::domain::{StorageConfig, TableInfo, DEFAULT_ROW_LIMIT};

#[derive(Debug, Deserialize)]
pub struct TestConnectionRequest {
    pub connection: StorageConfig,
}

#[derive(Debug, Serialize)]
pub struct TestConnectionResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(rename = "tableInfo", skip_serializing_if = "Option::is_none")]
    pub table_info: Option<TableInfo>,
}

fn default_row_limit() -> u32 {
    DEFAULT_ROW_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    pub connection: StorageConfig,
    #[serde(rename = "rowLimit", default = "default_row_limit")]
    pub row_limit: u32,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: &'static str,
    #[serde(rename = "engineVersion")]
    pub engine_version: Option<String>,
    pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct DemoConnectionResponse {
    #[serde(flatten)]
    pub connection: StorageConfig,
    #[serde(rename = "samplePath")]
    pub sample_path: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DemoQuery {
    pub name: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DemoQueriesResponse {
    pub queries: &'static [DemoQuery],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_default_row_limit() {
        let request: QueryRequest = serde_json::from_value(json!({
            "sql": "SELECT 1",
            "connection": {
                "storageType": "s3",
                "endpoint": "example.com",
                "accessKey": "k",
                "secretKey": "s"
            }
        }))
        .unwrap();
        assert_eq!(request.row_limit, DEFAULT_ROW_LIMIT);
    }

    #[test]
    fn test_query_request_negative_row_limit_rejected() {
        let result = serde_json::from_value::<QueryRequest>(json!({
            "sql": "SELECT 1",
            "connection": {
                "storageType": "s3",
                "endpoint": "example.com",
                "accessKey": "k",
                "secretKey": "s"
            },
            "rowLimit": -1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_test_connection_response_omits_missing_table_info() {
        let response = TestConnectionResponse {
            status: "success",
            message: "Connection successful",
            table_info: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "message": "Connection successful"})
        );
    }
}
