//! Control request and response messages.

use serde::{Deserialize, Serialize};

/// Request sent by a control client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Command name, e.g. `create_file`.
    pub action: String,
    /// Target path; missing or empty means the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// File body for `create_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether `content` is base64.
    #[serde(default, rename = "isBase64")]
    pub is_base64: bool,
}

impl ControlRequest {
    /// Request with only an action and a path.
    pub fn new(action: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Attach content.
    pub fn with_content(mut self, content: impl Into<String>, is_base64: bool) -> Self {
        self.content = Some(content.into());
        self.is_base64 = is_base64;
        self
    }
}

/// Response returned for every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Whether the action took effect.
    pub success: bool,
    /// Human-readable outcome, e.g. "File created successfully".
    pub message: String,
    /// Listed names; empty for non-listing actions.
    #[serde(default)]
    pub data: Vec<String>,
}

impl ControlResponse {
    /// Successful response.
    pub fn ok(message: impl Into<String>, data: Vec<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Failed response with no data.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_field_names() {
        let request: ControlRequest = serde_json::from_str(
            r#"{"action":"create_file","path":"\\a.txt","content":"aGk=","isBase64":true}"#,
        )
        .unwrap();
        assert_eq!(request.action, "create_file");
        assert_eq!(request.path.as_deref(), Some("\\a.txt"));
        assert!(request.is_base64);
    }

    #[test]
    fn test_request_optional_fields() {
        let request: ControlRequest = serde_json::from_str(r#"{"action":"list_all"}"#).unwrap();
        assert_eq!(request.path, None);
        assert_eq!(request.content, None);
        assert!(!request.is_base64);

        assert!(serde_json::from_str::<ControlRequest>(r#"{"path":"x"}"#).is_err());
    }

    #[test]
    fn test_response_always_has_data() {
        let json: String = serde_json::to_string(&ControlResponse::failure("nope")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"nope","data":[]}"#);
    }
}
