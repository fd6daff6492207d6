use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::models::rate_limit::RateLimitRecord;

/// 速率限制计数存储接口
///
/// 生产环境由 Redis 实现；测试中用内存实现或故障实现替换
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// 点查当前记录，键不存在时返回 None
    async fn get_record(&self, key: &str) -> Result<Option<RateLimitRecord>, redis::RedisError>;

    /// 原子自增计数，并无条件覆盖窗口结束时间与存储端过期时间
    async fn increment_and_set(
        &self,
        key: &str,
        reset_time: i64,
        expire_at: i64,
    ) -> Result<(), redis::RedisError>;
}

/// 基于 Redis 哈希的速率限制存储
pub struct RedisRateLimitStore {
    redis: Arc<RedisClient>,
}

impl RedisRateLimitStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn get_record(&self, key: &str) -> Result<Option<RateLimitRecord>, redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let request_count = fields
            .get("request_count")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let reset_time = fields
            .get("reset_time")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        Ok(Some(RateLimitRecord {
            request_count,
            reset_time,
        }))
    }

    async fn increment_and_set(
        &self,
        key: &str,
        reset_time: i64,
        expire_at: i64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        // HINCRBY 对不存在的键从 0 起步，等价于"不存在则初始化再自增"
        redis::pipe()
            .atomic()
            .hincr(key, "request_count", 1)
            .ignore()
            .hset(key, "reset_time", reset_time)
            .ignore()
            .cmd("EXPIREAT")
            .arg(key)
            .arg(expire_at)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}
