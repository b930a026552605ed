// common/src/models/verification.rs
use serde::{Deserialize, Serialize};

use crate::init_data::{InvalidReason, ValidatedInitData};

/// Body of `POST /api/verify-telegram-data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyInitDataRequest {
    #[serde(rename = "initData", default)]
    pub init_data: Option<String>,
}

/// Response for init data that passed verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedResponse {
    pub valid: bool,
    pub user: Option<serde_json::Value>,
    pub auth_date: i64,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
}

impl From<ValidatedInitData> for VerifiedResponse {
    fn from(data: ValidatedInitData) -> Self {
        Self {
            valid: true,
            user: data.user,
            auth_date: data.auth_date,
            query_id: data.query_id,
            start_param: data.start_param,
        }
    }
}

/// Response for rejected init data and for request errors.
/// Never carries the payload, the hash, or key material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub valid: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: error.into(),
        }
    }
}

impl From<InvalidReason> for ErrorResponse {
    fn from(reason: InvalidReason) -> Self {
        Self::new(reason.code())
    }
}
