use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use backend::{
    AppState,
    cache::operations::RedisRateLimitStore,
    config::Config,
    middleware::RateLimiter,
    router::create_router,
    storage::{HmacUrlSigner, PutUrlSigner},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");

    // 限流器与签名器在进程内各构造一次，随状态注入到各请求
    let store = Arc::new(RedisRateLimitStore::new(Arc::new(redis_client)));
    let rate_limiter = Arc::new(RateLimiter::new(
        store,
        config.rate_limit_requests,
        config.rate_limit_window_secs,
    ));
    let signer: Arc<dyn PutUrlSigner> = Arc::new(HmacUrlSigner::new(
        config.storage_endpoint.clone(),
        config.storage_signing_secret.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        rate_limiter,
        signer,
    };

    let router = create_router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
