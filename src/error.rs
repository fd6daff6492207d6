use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::routes::upload::validation::FileValidationError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    PermissionDenied,
    InvalidArgument(String),
    ValidationFailed(String),
    InternalServerError(String),
}

impl From<FileValidationError> for AppError {
    fn from(err: FileValidationError) -> Self {
        match err {
            FileValidationError::EmptyFileName
            | FileValidationError::FileNameTooLong
            | FileValidationError::InvalidUserId => AppError::InvalidArgument(err.to_string()),
            FileValidationError::DisallowedType
            | FileValidationError::FileTooLarge
            | FileValidationError::UnsafeAfterSanitize => {
                AppError::ValidationFailed(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "未授权访问".to_string(),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                error_codes::PERMISSION_DENIED,
                "需要管理员权限".to_string(),
            ),
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg)
            }
            AppError::ValidationFailed(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg)
            }
            AppError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                msg,
            ),
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}
