// src/error.rs

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("认证失败 (用户名或密码错误)")]
    AuthFailure,
    #[error("未提供登录凭据")]
    CredentialMissing,
    #[error("页面 '{url}' 请求失败 (状态码: {status})")]
    PageFetch { url: String, status: StatusCode },
    #[error("无权访问 '{0}' (403)")]
    Forbidden(String),
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("缺少下载来源: {0}")]
    MissingSource(String),
    #[error("视频地址解析失败: {0}")]
    VideoResolution(String),
    #[error("外部工具执行失败 (退出码: {code:?}): {stderr}")]
    ExternalTool { code: Option<i32>, stderr: String },
    #[error("切换学期失败: {0}")]
    SemesterChange(String),
    #[error("未找到课程: {0}")]
    CourseNotFound(String),
    #[error("已有下载任务正在运行")]
    RunInProgress,
    #[error("配置错误: {0}")]
    Config(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 是否属于可以立即重试的网络类错误。
    pub fn is_network(&self) -> bool {
        match self {
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err.is_body()
                    || err.is_decode()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            AppError::NetworkMiddleware(_) => true,
            AppError::PageFetch { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
