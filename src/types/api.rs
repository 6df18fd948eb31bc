use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.into(),
            version: version.into(),
        }
    }
}

/// Offset pagination used by the list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 { 100 }

impl ListParams {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn skip(&self) -> i64 {
        self.skip.max(0)
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_clamp_limit() {
        let params = ListParams { skip: -5, limit: 10_000 };
        assert_eq!(params.skip(), 0);
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn api_response_omits_empty_message() {
        let body = serde_json::to_value(ApiResponse::ok("fine")).unwrap();
        assert!(body.get("message").is_none());

        let body = serde_json::to_value(ApiResponse::ok_with_message("fine", "done")).unwrap();
        assert_eq!(body["message"], "done");
    }
}
