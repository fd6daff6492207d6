use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{admin_auth, log_errors, rate_limit},
    routes,
};

/// 组装全部路由与中间件
///
/// 管理路由的洋葱顺序是 认证 -> 限流 -> 处理器：
/// 未通过认证的请求不会触碰限流存储
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/photos/upload-url",
            post(routes::upload::handler::presign_upload),
        )
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), admin_auth));

    let public_routes = Router::new().route("/ping", get(routes::health::handler::ping));

    Router::new()
        .nest("/api", Router::new().merge(public_routes).merge(admin_routes))
        .layer(from_fn(log_errors))
        .with_state(state)
}
