use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    error::AppError,
    utils::{is_admin, verify_token},
};

/// 管理员认证中间件
///
/// 校验 Bearer 令牌并要求调用者属于管理员组，
/// 通过后把 Claims 挂到请求扩展上供后续层使用
pub async fn admin_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(bearer)) = bearer else {
        return Err(AppError::Unauthorized);
    };

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })?;

    if !is_admin(&claims, &state.config) {
        tracing::info!("User {} denied admin access", claims.sub);
        return Err(AppError::PermissionDenied);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
