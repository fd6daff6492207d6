use std::fmt;

use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 对象键在 URL 路径段中需要转义的字符
const OBJECT_KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'?')
    .add(b'/')
    .add(b'\\');

/// 签发预签名地址失败
#[derive(Debug)]
pub struct SignerError(pub String);

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SignerError {}

/// 对象存储预签名接口
///
/// 端点层只依赖这个接口；签发失败按基础设施错误处理（拒绝而非放行）
pub trait PutUrlSigner: Send + Sync {
    /// 为指定桶和对象键签发限时 PUT 地址
    fn issue_signed_put_url(
        &self,
        bucket: &str,
        object_key: &str,
        expires_in_secs: u64,
    ) -> Result<String, SignerError>;
}

/// 基于 HMAC-SHA256 的预签名器
///
/// 签名覆盖方法、桶、对象键与绝对过期时间，
/// 存储网关用同一密钥即可离线校验
pub struct HmacUrlSigner {
    endpoint: String,
    secret: String,
}

impl HmacUrlSigner {
    pub fn new(endpoint: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: secret.into(),
        }
    }
}

impl PutUrlSigner for HmacUrlSigner {
    fn issue_signed_put_url(
        &self,
        bucket: &str,
        object_key: &str,
        expires_in_secs: u64,
    ) -> Result<String, SignerError> {
        if self.secret.is_empty() {
            return Err(SignerError("signing secret is not configured".to_string()));
        }

        let expires_at = Utc::now().timestamp() + expires_in_secs as i64;
        let string_to_sign = format!("PUT\n{}\n{}\n{}", bucket, object_key, expires_at);

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SignerError(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let encoded_key = utf8_percent_encode(object_key, OBJECT_KEY_ENCODE_SET);
        Ok(format!(
            "{}/{}/{}?expires={}&signature={}",
            self.endpoint.trim_end_matches('/'),
            bucket,
            encoded_key,
            expires_at,
            signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_url_contains_bucket_key_and_signature() {
        let signer = HmacUrlSigner::new("https://storage.example.com", "secret");
        let url = signer
            .issue_signed_put_url("photos", "user-1_a_123.png", 3600)
            .unwrap();

        assert!(url.starts_with("https://storage.example.com/photos/user-1_a_123.png?expires="));
        let signature = url.split("signature=").nth(1).unwrap();
        // HMAC-SHA256 的十六进制摘要长度固定
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let signer = HmacUrlSigner::new("https://storage.example.com", "");
        assert!(signer.issue_signed_put_url("photos", "a.png", 3600).is_err());
    }
}
