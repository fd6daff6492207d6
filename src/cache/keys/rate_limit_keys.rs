/// 速率限制键前缀
const RATE_LIMIT_PREFIX: &str = "RATE_LIMIT#";

/// 生成 (用户, 动作) 的速率限制键
///
/// 动作字符串切分命名空间，同一用户的不同动作互不干扰
pub fn rate_limit_key(user_id: &str, action: &str) -> String {
    format!("{}{}:{}", RATE_LIMIT_PREFIX, user_id, action)
}
