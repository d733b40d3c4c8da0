// src/config.rs

pub mod credentials;

use self::credentials::load_or_create_external_config;
use crate::{constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// 课程门户的地址与路径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_url: String,
    pub all_courses_path: String,
    pub home_path: String,
    pub course_view_path: String,
    /// 拼接在用户名后的认证域，例如 `user@student.example.edu`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cms.guc.edu.eg".into(),
            login_url: "https://apps.guc.edu.eg/student_ext/Console.aspx".into(),
            all_courses_path: "/apps/student/ViewAllCourseStn".into(),
            home_path: "/apps/student/HomePageStn.aspx".into(),
            course_view_path: "/apps/student/CourseViewStn.aspx".into(),
            auth_domain: Some("student.guc.edu.eg".into()),
        }
    }
}

/// 视频流解析 API，模板中的 `{content_id}` 会被替换
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoApiConfig {
    pub lookup_url_template: String,
    pub access_url_template: String,
}

impl Default for VideoApiConfig {
    fn default() -> Self {
        Self {
            lookup_url_template:
                "https://playback.dacast.com/content/info?contentId={content_id}&provider=dacast".into(),
            access_url_template:
                "https://playback.dacast.com/content/access?contentId={content_id}&provider=universe".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytdlp_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub video_api: VideoApiConfig,
    #[serde(default)]
    pub tools: ToolConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        // 为 NetworkConfig 提供一组稳健的默认值
        let network_config = NetworkConfig {
            connect_timeout_secs: Some(10),
            timeout_secs: Some(120),
            max_retries: Some(3),
        };

        Self {
            username: None,
            password: None,
            network: network_config,
            portal: PortalConfig::default(),
            video_api: VideoApiConfig::default(),
            tools: ToolConfig::default(),
        }
    }
}

/// 外部工具位置。在调用时解析，环境变量优先于配置文件。
#[derive(Debug, Clone, Default)]
pub struct ToolLocations {
    configured_ytdlp: Option<String>,
    configured_ffmpeg: Option<String>,
}

impl ToolLocations {
    pub fn new(configured_ytdlp: Option<String>, configured_ffmpeg: Option<String>) -> Self {
        Self { configured_ytdlp, configured_ffmpeg }
    }

    pub fn ytdlp(&self) -> String {
        resolve_tool(
            constants::env::YTDLP_PATH,
            self.configured_ytdlp.as_deref(),
            constants::tools::DEFAULT_YTDLP,
        )
    }

    pub fn ffmpeg(&self) -> String {
        resolve_tool(
            constants::env::FFMPEG_PATH,
            self.configured_ffmpeg.as_deref(),
            constants::tools::DEFAULT_FFMPEG,
        )
    }
}

fn resolve_tool(env_key: &str, configured: Option<&str>, fallback: &str) -> String {
    if let Ok(path) = env::var(env_key) && !path.trim().is_empty() {
        return path;
    }
    match configured {
        Some(path) if !path.trim().is_empty() => path.to_string(),
        _ => fallback.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub portal: PortalConfig,
    pub video_api: VideoApiConfig,
    pub tools: ToolLocations,
}

impl AppConfig {
    pub fn new() -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        Ok(Self::from_external(external_config))
    }

    pub fn from_external(external_config: ExternalConfig) -> Self {
        Self {
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(
                external_config.network.connect_timeout_secs.unwrap_or(10),
            ),
            timeout: Duration::from_secs(external_config.network.timeout_secs.unwrap_or(120)),
            max_retries: external_config.network.max_retries.unwrap_or(3),
            portal: external_config.portal,
            video_api: external_config.video_api,
            tools: ToolLocations::new(
                external_config.tools.ytdlp_path,
                external_config.tools.ffmpeg_path,
            ),
        }
    }

    pub fn portal_url(&self, path: &str) -> String {
        format!("{}{}", self.portal.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 0,
            portal: PortalConfig::default(),
            video_api: VideoApiConfig::default(),
            tools: ToolLocations::default(),
        }
    }
}
