use serde::{Deserialize, Serialize};

/// 预签名上传请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadRequest {
    pub file_name: Option<String>,
    /// 客户端自报的文件大小，仅作提示性校验，真正的字节限制在上传侧
    pub file_size: Option<u64>,
}

/// 预签名上传响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadResponse {
    pub url: String,
    /// 实际写入对象存储的键
    pub file_name: String,
    pub original_file_name: String,
}
