use serde::Serialize;

use crate::ApiError;

/// Outcome of a client call. Transport failures never escape as anything else.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiResult<T> {
    Success { data: T },
    Failure { message: String, code: u16 },
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the payload of a success.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the status code of a failure.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => Some(*code),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { message, code } => Err(ApiError {
                code,
                message,
                details: None,
            }),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            Self::Success { data } => ApiResult::Success { data: f(data) },
            Self::Failure { message, code } => ApiResult::Failure { message, code },
        }
    }
}

impl<T> From<ApiError> for ApiResult<T> {
    fn from(err: ApiError) -> Self {
        Self::Failure {
            message: err.message,
            code: err.code,
        }
    }
}
