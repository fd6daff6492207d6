use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
};

use super::model::{PresignUploadRequest, PresignUploadResponse};
use super::validation::{generate_unique_file_name, validate_file};
use crate::AppState;
use crate::error::AppError;
use crate::utils::{Claims, success_to_api_response};

/// 签发管理端照片上传的预签名地址
///
/// 认证与限流由外层中间件完成，这里依次做：
/// 请求体校验 -> 类型校验 -> 净化与唯一化 -> 签发。
/// 任何一步失败都短路返回，成功路径恰好产生一次签发
#[axum::debug_handler]
pub async fn presign_upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PresignUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(original_file_name) = req.file_name else {
        return Err(AppError::InvalidArgument("缺少文件名".to_string()));
    };

    validate_file(&original_file_name, req.file_size).map_err(|e| {
        tracing::info!("Rejected upload file name {:?}: {}", original_file_name, e);
        e
    })?;

    let unique_file_name = generate_unique_file_name(&original_file_name, Some(&claims.sub))?;

    let url = state
        .signer
        .issue_signed_put_url(
            &state.config.storage_bucket,
            &unique_file_name,
            state.config.presign_expiry_secs,
        )
        .map_err(|e| {
            tracing::error!("Failed to issue signed upload url: {}", e);
            AppError::InternalServerError("生成上传地址失败".to_string())
        })?;

    Ok(success_to_api_response(PresignUploadResponse {
        url,
        file_name: unique_file_name,
        original_file_name,
    }))
}
