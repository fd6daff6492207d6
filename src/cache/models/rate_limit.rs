use serde::{Deserialize, Serialize};

/// 速率限制缓存数据模型
///
/// 一条记录对应一个 (用户, 动作) 的当前窗口；reset_time 之后记录逻辑过期，
/// 读取方必须按计数为 0 处理，物理删除交给存储端的 TTL
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitRecord {
    pub request_count: u32,
    pub reset_time: i64, // Unix timestamp
}
