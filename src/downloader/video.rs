// src/downloader/video.rs

//! 视频点播：内容 ID → HLS 清单地址 → 外部工具转封装为本地文件。

use crate::{
    client::RobustClient,
    config::{AppConfig, ToolLocations},
    constants,
    error::*,
    models::api::{ContentAccessResponse, ContentInfoResponse},
};
use async_trait::async_trait;
use log::{debug, error, info};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::{
    ffi::OsString,
    io::ErrorKind,
    path::Path,
    process::Stdio,
    sync::Arc,
};
use tokio::process::Command;

const CONTENT_ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// 带下划线且较短的 ID 需要先通过查询接口换成完整 ID
pub fn is_short_id(content_id: &str) -> bool {
    content_id.contains(constants::video::SHORT_ID_SEPARATOR)
        && content_id.len() < constants::video::SHORT_ID_MAX_LEN
}

/// 视频流地址解析。请求不携带门户凭据。
pub struct VideoResolver {
    http_client: Arc<RobustClient>,
    config: Arc<AppConfig>,
}

impl VideoResolver {
    pub fn new(http_client: Arc<RobustClient>, config: Arc<AppConfig>) -> Self {
        Self { http_client, config }
    }

    fn endpoint(template: &str, content_id: &str) -> String {
        let encoded = utf8_percent_encode(content_id, CONTENT_ID_ENCODE_SET).to_string();
        template.replace("{content_id}", &encoded)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let res = self.http_client.get_public(url).await?;
        if res.status() != StatusCode::OK {
            return Err(AppError::VideoResolution(format!(
                "接口 '{}' 返回状态码 {}",
                url,
                res.status()
            )));
        }
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn canonical_id(&self, content_id: &str) -> AppResult<String> {
        if !is_short_id(content_id) {
            return Ok(content_id.to_string());
        }
        debug!("检测到短内容 ID '{}'，查询完整 ID", content_id);
        let url = Self::endpoint(&self.config.video_api.lookup_url_template, content_id);
        let info: ContentInfoResponse = self.fetch_json(&url).await?;
        let resolved = info
            .content_info
            .and_then(|i| i.content_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::VideoResolution(format!("查询结果中没有 '{}' 的完整 ID", content_id)))?;
        debug!("内容 ID '{}' -> '{}'", content_id, resolved);
        Ok(resolved)
    }

    /// 返回 HLS 清单地址
    pub async fn resolve(&self, content_id: &str) -> AppResult<String> {
        let canonical = self.canonical_id(content_id).await?;
        let url = Self::endpoint(&self.config.video_api.access_url_template, &canonical);
        let access: ContentAccessResponse = self.fetch_json(&url).await?;
        access
            .hls
            .filter(|hls| !hls.is_empty())
            .ok_or_else(|| AppError::VideoResolution(format!("访问接口未返回 '{}' 的 HLS 地址", canonical)))
    }
}

/// 把流媒体清单保存为本地文件的外部工具
#[async_trait]
pub trait MediaRemuxer: Send + Sync {
    async fn remux(&self, manifest_url: &str, destination: &Path) -> AppResult<()>;
}

pub struct YtDlpRemuxer {
    tools: ToolLocations,
}

impl YtDlpRemuxer {
    pub fn new(tools: ToolLocations) -> Self {
        Self { tools }
    }

    pub fn command_args(ffmpeg: &str, manifest_url: &str, destination: &Path) -> Vec<OsString> {
        vec![
            "--downloader".into(),
            "ffmpeg".into(),
            "--ffmpeg-location".into(),
            ffmpeg.into(),
            "--hls-use-mpegts".into(),
            "-o".into(),
            destination.as_os_str().to_owned(),
            manifest_url.into(),
        ]
    }
}

#[async_trait]
impl MediaRemuxer for YtDlpRemuxer {
    async fn remux(&self, manifest_url: &str, destination: &Path) -> AppResult<()> {
        // 每次调用时重新解析，环境变量的修改立即生效
        let ytdlp = self.tools.ytdlp();
        let ffmpeg = self.tools.ffmpeg();
        info!("调用 '{}' 下载视频到 {:?}", ytdlp, destination);

        let output = Command::new(&ytdlp)
            .args(Self::command_args(&ffmpeg, manifest_url, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => AppError::ExternalTool {
                    code: None,
                    stderr: format!("找不到外部工具 '{}' (可通过 {} 指定)", ytdlp, constants::env::YTDLP_PATH),
                },
                _ => AppError::Io(e),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("'{}' 退出码 {:?}: {}", ytdlp, output.status.code(), stderr);
        Err(AppError::ExternalTool { code: output.status.code(), stderr })
    }
}

/// 解析 + 转封装 + 输出检查
pub struct VideoPipeline {
    resolver: VideoResolver,
    remuxer: Arc<dyn MediaRemuxer>,
}

impl VideoPipeline {
    pub fn new(resolver: VideoResolver, remuxer: Arc<dyn MediaRemuxer>) -> Self {
        Self { resolver, remuxer }
    }

    pub async fn download(&self, content_id: &str, destination: &Path) -> AppResult<()> {
        let manifest = self.resolver.resolve(content_id).await?;
        self.remuxer.remux(&manifest, destination).await?;
        if !destination.is_file() {
            return Err(AppError::ExternalTool {
                code: Some(0),
                stderr: format!("工具执行成功但未生成文件 {:?}", destination),
            });
        }
        Ok(())
    }
}
