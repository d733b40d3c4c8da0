// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod models;
pub mod symbols;
pub mod ui;
pub mod utils;
mod workflows;

use crate::{
    catalog::Catalog,
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    downloader::{Executor, RetryPolicy, VideoPipeline, VideoResolver, YtDlpRemuxer},
    error::{AppError, AppResult},
    models::{Credential, PlanOptions},
};
use colored::*;
use log::{debug, info};
use std::sync::{Arc, atomic::AtomicBool};

/// 核心的执行上下文，包含所有任务所需的状态和工具
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub http_client: Arc<RobustClient>,
    pub catalog: Arc<Catalog>,
    pub credential: Credential,
    pub args: Arc<Cli>,
    pub cancellation_token: Arc<AtomicBool>,
}

impl AppContext {
    pub fn video_pipeline(&self) -> VideoPipeline {
        VideoPipeline::new(
            VideoResolver::new(self.http_client.clone(), self.config.clone()),
            Arc::new(YtDlpRemuxer::new(self.config.tools.clone())),
        )
    }

    pub fn executor(&self, retry: RetryPolicy) -> Executor {
        Executor::new(
            self.http_client.clone(),
            self.config.clone(),
            self.credential.clone(),
            Arc::new(self.video_pipeline()),
            retry,
        )
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            root: self.args.output.clone(),
            org_mode: self.args.org_mode,
            include_week: !self.args.no_week,
            include_type: self.args.include_type,
            include_week_description: self.args.week_description,
        }
    }
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    let config = AppConfig::new()?;
    run_with_config(args, config, cancellation_token).await
}

pub async fn run_with_config(
    args: Arc<Cli>,
    config: AppConfig,
    cancellation_token: Arc<AtomicBool>,
) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    let config = Arc::new(config);
    debug!("加载的应用配置: {:?}", config);
    let http_client = Arc::new(RobustClient::new(config.clone())?);

    // 视频接口不需要门户凭据
    if let Some(content_id) = &args.vod {
        return workflows::run_vod(&args, config, http_client, content_id).await;
    }

    let (credential, prompted) = obtain_credential(&args)?;
    let catalog = Arc::new(Catalog::new(http_client.clone(), config.clone()));
    catalog.login(&credential).await?;
    info!("用户 '{}' 登录成功", credential.username);
    println!("{} 登录成功。", *symbols::OK);
    if prompted && ui::confirm("是否将登录凭据保存到本地配置文件?", false) {
        crate::config::credentials::save_credentials(&credential)?;
    }

    let context = AppContext {
        config,
        http_client,
        catalog,
        credential,
        args: args.clone(),
        cancellation_token,
    };

    if args.interactive {
        workflows::run_interactive(context).await
    } else if args.list {
        workflows::run_list(context).await
    } else if args.all {
        workflows::run_all(context).await
    } else if let Some(name) = &args.course {
        workflows::run_course(context, name).await
    } else {
        Ok(())
    }
}

/// 解析登录凭据，缺失的部分通过终端输入补全。第二项表示是否经过了手动输入。
fn obtain_credential(args: &Cli) -> AppResult<(Credential, bool)> {
    let (username, password, source) =
        crate::config::credentials::resolve_credentials(args.username.as_deref(), args.password.as_deref());
    let mut prompted = false;

    let username = match username {
        Some(username) => {
            info!("从 {} 加载用户名", source);
            username
        }
        None => {
            prompted = true;
            ui::prompt("请输入门户用户名", None).map_err(|_| AppError::UserInterrupt)?
        }
    };
    let password = match password {
        Some(password) => password,
        None => {
            prompted = true;
            ui::prompt_hidden(&format!("请输入用户 '{}' 的密码", username)).map_err(|_| AppError::UserInterrupt)?
        }
    };
    if username.trim().is_empty() || password.is_empty() {
        println!("{}", format!("{} 未提供用户名或密码。", *symbols::WARN).yellow());
        return Err(AppError::CredentialMissing);
    }
    Ok((Credential::new(username.trim(), password), prompted))
}
