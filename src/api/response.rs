//! Stable success envelope for API responses.

use serde::Serialize;

/// Every successful response has this shape; failures use the mirrored
/// `{"success": false, "message"}` shape from the error mapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new<S: Into<String>>(data: T, message: S) -> Self {
        Self { success: true, data: Some(data), message: message.into() }
    }
}

impl ApiResponse<()> {
    /// A data-less success response.
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self { success: true, data: None, message: message.into() }
    }
}
