use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    AppState,
    cache::{keys::rate_limit_key, operations::RateLimitStore},
    error::AppError,
    utils::{ApiResponse, error_codes, extract_user_id},
};

/// 上传授权动作的限流命名空间
pub const PRESIGN_ACTION: &str = "presigned-url";

/// 记录过期后在存储中额外保留的秒数
const RECORD_RETENTION_SECS: i64 = 86400;

/// 一次限流判定的结果
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: i64,
}

/// 限流拒绝时返回给客户端的数据
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitRejection {
    limit: u32,
    remaining: u32,
    reset_time: i64,
}

/// 分布式限流器
///
/// 计数放在共享存储中，各实例之间没有进程内状态，
/// 跨实例协调完全依赖存储端的单键原子自增
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_requests: u32, window_secs: u64) -> Self {
        Self {
            store,
            max_requests,
            window_secs,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// 检查 (用户, 动作) 在当前窗口内是否超出限额
    ///
    /// 读取与自增不是同一个事务：允许/拒绝基于可能过期的读数，
    /// 并发突发下窗口内可能略微超过 max_requests，这是既定取舍
    pub async fn check_rate_limit(
        &self,
        user_id: &str,
        action: &str,
    ) -> Result<RateLimitDecision, AppError> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user_id 不能为空".to_string()));
        }
        if action.is_empty() {
            return Err(AppError::InvalidArgument("action 不能为空".to_string()));
        }

        let key = rate_limit_key(user_id, action);
        let now = Utc::now().timestamp();
        let reset_time = now + self.window_secs as i64;

        match self.try_check(&key, now, reset_time).await {
            Ok(decision) => Ok(decision),
            Err(e) => {
                // 存储故障时放行而不是拒绝，限流器不能因基础设施问题拦截正常流量
                tracing::warn!("Rate limit store error for {}: {}, failing open", key, e);
                Ok(RateLimitDecision {
                    allowed: true,
                    remaining: self.max_requests - 1,
                    reset_time,
                })
            }
        }
    }

    async fn try_check(
        &self,
        key: &str,
        now: i64,
        reset_time: i64,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let record = self.store.get_record(key).await?;

        // 窗口仍有效时沿用存储的计数；过期记录视同不存在，
        // 其 reset_time 不再复用，新窗口从本次请求起算
        let request_count = match record {
            Some(r) if r.reset_time > now => r.request_count,
            _ => 0,
        };

        if request_count >= self.max_requests {
            // 拒绝路径不写回，旧记录留给存储端 TTL 自然过期
            return Ok(RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time,
            });
        }

        self.store
            .increment_and_set(key, reset_time, reset_time + RECORD_RETENTION_SECS)
            .await?;

        Ok(RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - request_count - 1,
            reset_time,
        })
    }
}

/// 限流中间件：按用户与固定动作检查限额，超限时直接返回 429
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = extract_user_id(req.extensions());

    let decision = state
        .rate_limiter
        .check_rate_limit(&user_id, PRESIGN_ACTION)
        .await?;

    if !decision.allowed {
        let body = Json(ApiResponse {
            code: error_codes::RATE_LIMIT,
            msg: format!(
                "请求过于频繁，请在{}秒后重试",
                state.config.rate_limit_window().as_secs()
            ),
            resp_data: Some(RateLimitRejection {
                limit: state.rate_limiter.max_requests(),
                remaining: decision.remaining,
                reset_time: decision.reset_time,
            }),
        });

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(state.rate_limiter.max_requests()));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(decision.reset_time));
        return Ok(response);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::models::rate_limit::RateLimitRecord;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<String, RateLimitRecord>>,
    }

    impl MemoryStore {
        fn seed(&self, key: &str, record: RateLimitRecord) {
            self.records.lock().unwrap().insert(key.to_string(), record);
        }
    }

    #[async_trait]
    impl RateLimitStore for MemoryStore {
        async fn get_record(
            &self,
            key: &str,
        ) -> Result<Option<RateLimitRecord>, redis::RedisError> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn increment_and_set(
            &self,
            key: &str,
            reset_time: i64,
            _expire_at: i64,
        ) -> Result<(), redis::RedisError> {
            let mut records = self.records.lock().unwrap();
            let record = records.entry(key.to_string()).or_insert(RateLimitRecord {
                request_count: 0,
                reset_time,
            });
            record.request_count += 1;
            record.reset_time = reset_time;
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RateLimitStore for FailingStore {
        async fn get_record(
            &self,
            _key: &str,
        ) -> Result<Option<RateLimitRecord>, redis::RedisError> {
            Err(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "store unavailable",
            )))
        }

        async fn increment_and_set(
            &self,
            _key: &str,
            _reset_time: i64,
            _expire_at: i64,
        ) -> Result<(), redis::RedisError> {
            Err(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "store unavailable",
            )))
        }
    }

    fn limiter_with(store: Arc<dyn RateLimitStore>) -> RateLimiter {
        RateLimiter::new(store, 10, 300)
    }

    #[tokio::test]
    async fn allows_up_to_max_then_denies() {
        let limiter = limiter_with(Arc::new(MemoryStore::default()));

        for i in 0..10u32 {
            let decision = limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();
            assert!(decision.allowed, "request {} should be allowed", i + 1);
            assert_eq!(decision.remaining, 10 - i - 1);
        }

        let denied = limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_time > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn expired_window_is_treated_as_fresh() {
        let store = Arc::new(MemoryStore::default());
        let key = rate_limit_key("user-1", "presigned-url");
        store.seed(
            &key,
            RateLimitRecord {
                request_count: 10,
                reset_time: Utc::now().timestamp() - 5,
            },
        );

        let limiter = limiter_with(store);
        let decision = limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
        assert!(decision.reset_time > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn actions_do_not_interfere() {
        let limiter = limiter_with(Arc::new(MemoryStore::default()));

        for _ in 0..10 {
            limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();
        }
        assert!(!limiter.check_rate_limit("user-1", "presigned-url").await.unwrap().allowed);

        let other = limiter.check_rate_limit("user-1", "delete").await.unwrap();
        assert!(other.allowed);
        assert_eq!(other.remaining, 9);
    }

    #[tokio::test]
    async fn store_failure_fails_open() {
        let limiter = limiter_with(Arc::new(FailingStore));

        let decision = limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let limiter = limiter_with(Arc::new(MemoryStore::default()));

        assert!(matches!(
            limiter.check_rate_limit("", "presigned-url").await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            limiter.check_rate_limit("user-1", "").await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn denied_calls_do_not_touch_the_counter() {
        let store = Arc::new(MemoryStore::default());
        let limiter = limiter_with(store.clone());

        for _ in 0..10 {
            limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();
        }
        limiter.check_rate_limit("user-1", "presigned-url").await.unwrap();

        let key = rate_limit_key("user-1", "presigned-url");
        let count = store.records.lock().unwrap().get(&key).unwrap().request_count;
        assert_eq!(count, 10);
    }
}
