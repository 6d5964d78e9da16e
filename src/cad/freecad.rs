use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{mock, CadError};
use crate::models::CadContext;
use crate::pipeline::{CadExtractor, CollaboratorError};

const EXTRACTION_SCRIPT: &str = include_str!("../../resources/freecad/extract_cad_context.py");

const HEALTH_SCRIPT: &str = "import FreeCAD; result = {'version': FreeCAD.Version()}";

/// Client for a FreeCAD JSON-RPC server (`execute_python` method).
///
/// In mock mode no request is made; extraction returns the desk demo model.
pub struct FreecadClient {
    base_url: String,
    client: reqwest::Client,
    mock_mode: bool,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: RpcParams<'a>,
    id: u32,
}

#[derive(Serialize)]
struct RpcParams<'a> {
    code: &'a str,
}

impl FreecadClient {
    pub fn new(base_url: &str, timeout_secs: u64, mock_mode: bool) -> Result<Self, CadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CadError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            mock_mode,
        })
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when the RPC server answers. Always true in mock mode.
    pub async fn health_check(&self) -> bool {
        if self.mock_mode {
            return true;
        }
        match self.post(HEALTH_SCRIPT).await {
            Ok(_) => {
                tracing::info!(url = %self.base_url, "FreeCAD RPC health check passed");
                true
            }
            Err(e) => {
                tracing::debug!(url = %self.base_url, error = %e, "FreeCAD RPC not reachable");
                false
            }
        }
    }

    /// Execute Python inside FreeCAD and return its `result` value.
    pub async fn execute_python(&self, code: &str) -> Result<Value, CadError> {
        let body = self.post(code).await?;
        let result = parse_rpc_result(body)?;
        tracing::info!(
            keys = result.as_object().map(|o| o.len()).unwrap_or(0),
            "FreeCAD execute_python completed"
        );
        Ok(result)
    }

    /// Run the extraction script against the active document.
    pub async fn extract_cad_context(&self) -> Result<CadContext, CadError> {
        if self.mock_mode {
            return Ok(mock::desk_context());
        }
        let result = self.execute_python(EXTRACTION_SCRIPT).await?;
        serde_json::from_value(result).map_err(|e| CadError::InvalidResult(e.to_string()))
    }

    async fn post(&self, code: &str) -> Result<Value, CadError> {
        let payload = RpcRequest {
            jsonrpc: "2.0",
            method: "execute_python",
            params: RpcParams { code },
            id: 1,
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    CadError::Connection(self.base_url.clone())
                } else {
                    CadError::HttpClient(e.to_string())
                }
            })?;

        let response = response
            .error_for_status()
            .map_err(|e| CadError::HttpClient(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| CadError::InvalidResult(e.to_string()))
    }
}

/// Unwrap a JSON-RPC response body. Servers return `result` either as an
/// object or as a JSON-encoded string.
fn parse_rpc_result(body: Value) -> Result<Value, CadError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(CadError::Execution(error.to_string()));
    }
    match body.get("result") {
        Some(Value::String(encoded)) => {
            serde_json::from_str(encoded).map_err(|e| CadError::InvalidResult(e.to_string()))
        }
        Some(value) => Ok(value.clone()),
        None => Ok(Value::Object(Default::default())),
    }
}

#[async_trait]
impl CadExtractor for FreecadClient {
    async fn extract(&self, _hint: &str) -> Result<CadContext, CollaboratorError> {
        Ok(self.extract_cad_context().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rpc_result_as_object() {
        let v = parse_rpc_result(json!({"result": {"document_name": "desk"}, "id": 1})).unwrap();
        assert_eq!(v["document_name"], "desk");
    }

    #[test]
    fn rpc_result_as_encoded_string() {
        let v = parse_rpc_result(json!({"result": "{\"objects\": []}"})).unwrap();
        assert!(v["objects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn rpc_error_is_execution_error() {
        let err = parse_rpc_result(json!({"error": {"message": "NameError"}})).unwrap_err();
        assert!(matches!(err, CadError::Execution(_)));
    }

    #[test]
    fn rpc_unparseable_string_result() {
        let err = parse_rpc_result(json!({"result": "not json"})).unwrap_err();
        assert!(matches!(err, CadError::InvalidResult(_)));
    }

    #[test]
    fn no_active_document_parses_as_errored_context() {
        let v = parse_rpc_result(json!({"result": "{\"error\": \"No active document\"}"})).unwrap();
        let ctx: CadContext = serde_json::from_value(v).unwrap();
        assert!(!ctx.is_usable());
    }

    #[test]
    fn request_shape() {
        let payload = RpcRequest {
            jsonrpc: "2.0",
            method: "execute_python",
            params: RpcParams { code: "x = 1" },
            id: 1,
        };
        let json = serde_json::to_value(payload).unwrap();
        assert_eq!(json["method"], "execute_python");
        assert_eq!(json["params"]["code"], "x = 1");
    }

    #[tokio::test]
    async fn mock_mode_returns_desk_without_network() {
        let client = FreecadClient::new("http://127.0.0.1:9", 1, true).unwrap();
        assert!(client.health_check().await);
        let ctx = client.extract_cad_context().await.unwrap();
        assert_eq!(ctx.document_name.as_deref(), Some("Unnamed"));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let client = FreecadClient::new("http://127.0.0.1:9/", 2, false).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert!(!client.health_check().await);
        let err = CadExtractor::extract(&client, "desk").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[test]
    fn extraction_script_sets_result() {
        assert!(EXTRACTION_SCRIPT.contains("result = json.dumps"));
        assert!(EXTRACTION_SCRIPT.contains("No active document"));
    }
}
