// src/models/api.rs

use serde::Deserialize;

// --- 视频播放接口 ---

#[derive(Deserialize, Debug, Clone)]
pub struct ContentInfo {
    #[serde(rename = "contentId")]
    pub content_id: Option<String>,
}

/// 查询接口的响应，用于把短 ID 换成完整的内容 ID
#[derive(Deserialize, Debug, Clone)]
pub struct ContentInfoResponse {
    #[serde(rename = "contentInfo")]
    pub content_info: Option<ContentInfo>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ContentAccessResponse {
    pub hls: Option<String>,
}
