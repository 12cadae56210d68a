use serde::Serialize;

/// JSON envelope shared by every `/api/users` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            is_success: true,
            data: Some(data),
            msg: None,
            token: None,
            code: None,
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl ApiResponse<()> {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            is_success: true,
            data: None,
            msg: Some(msg.into()),
            token: None,
            code: None,
        }
    }

    pub fn failure(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            is_success: false,
            data: None,
            msg: Some(msg.into()),
            token: None,
            code: Some(code),
        }
    }
}
