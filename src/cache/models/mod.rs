// 速率限制记录模型
pub mod rate_limit;
