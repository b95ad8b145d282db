//! Response envelope shared by every API endpoint.
//!
//! ```text
//! {"success": true,  "data": ...}
//! {"success": false, "error": {"code": "NOT_FOUND", "message": "...", "details": {...}}}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Splits the envelope into the payload or the error body.
    pub fn into_result(self) -> Result<Option<T>, ErrorBody> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data),
            (false, Some(error)) => Err(error),
            (false, None) => Err(ErrorBody {
                code: "INTERNAL_ERROR".to_string(),
                message: "Response reported failure without an error body".to_string(),
                details: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_omits_error() {
        let json = serde_json::to_value(ApiEnvelope::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_error_round_trip() {
        let body = r#"{"success":false,"error":{"code":"UNAUTHORIZED","message":"Unauthorized"}}"#;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(body).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.code, "UNAUTHORIZED");
        assert!(err.details.is_none());
    }
}
