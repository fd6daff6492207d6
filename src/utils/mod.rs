use axum::Json;
use axum::http::Extensions;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 匿名调用者的限流归属键
pub const ANONYMOUS_USER_ID: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // 用户ID
    pub exp: i64,             // 过期时间
    pub iat: i64,             // 签发时间
    #[serde(default)]
    pub groups: Vec<String>,  // 身份提供方下发的用户组
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 判断调用者是否属于配置的管理员组
pub fn is_admin(claims: &Claims, config: &Config) -> bool {
    claims.groups.iter().any(|g| g == &config.admin_group)
}

/// 从请求扩展中取出用户ID，未认证时退化为共享的 anonymous 键
pub fn extract_user_id(extensions: &Extensions) -> String {
    extensions
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub resp_data: Option<T>,
}

// 所有 handler 的响应统一走 ApiResponse 信封
pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INTERNAL_ERROR: i32 = 5000;
}
