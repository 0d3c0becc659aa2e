use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Conflict,
    CapacityExceeded,
    Unauthorized,
    Unavailable,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Danger,
}

/// Message shown to the shopper in an alert banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl UserNotice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            code: None,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: None,
            message: message.into(),
        }
    }

    pub fn rejected(code: ErrorCode, message: impl Into<String>) -> Self {
        let severity = match code {
            ErrorCode::Validation | ErrorCode::CapacityExceeded | ErrorCode::Unauthorized => {
                Severity::Warning
            }
            _ => Severity::Danger,
        };
        Self {
            severity,
            code: Some(code),
            message: message.into(),
        }
    }
}
