// src/config/credentials.rs

use crate::{
    config::ExternalConfig, // 只需要从父模块导入结构体定义
    constants,
    error::{AppError, AppResult},
    models::Credential,
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::PathBuf};

pub(crate) fn get_config_path() -> AppResult<PathBuf> {
    let path = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
        .join(constants::CONFIG_DIR_NAME)
        .join(constants::CONFIG_FILE_NAME);
    Ok(path)
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("配置文件 {:?} 不存在，将创建默认配置。", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

/// 将用户名与密码写入本地配置文件。
pub fn save_credentials(credential: &Credential) -> AppResult<()> {
    if credential.username.is_empty() {
        return Ok(());
    }

    let config_path = get_config_path()?;
    let mut config = load_or_create_external_config()?;

    config.username = Some(credential.username.clone());
    config.password = Some(credential.password.clone());

    let json_content = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, json_content)
        .with_context(|| format!("保存登录凭据到 '{}' 失败", config_path.display()))?;

    info!("用户已将登录凭据保存至配置文件: {}", config_path.display());
    println!(
        "{} 登录凭据已成功保存至: {}",
        *crate::symbols::INFO,
        config_path.display()
    );

    Ok(())
}

fn load_credentials_from_config() -> (Option<String>, Option<String>) {
    load_or_create_external_config()
        .map(|config| (config.username, config.password))
        .unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 按 命令行 → 环境变量 → 配置文件 的优先级分别解析用户名和密码。
/// 返回值中的第三项描述了用户名的来源。命令行与环境变量已经给全时不读取配置文件。
pub fn resolve_credentials(
    cli_username: Option<&str>,
    cli_password: Option<&str>,
) -> (Option<String>, Option<String>, String) {
    let mut username = None;
    let mut password = None;
    let mut source = "未找到".to_string();

    let mut take = |user: Option<String>, pass: Option<String>, name: &str| {
        if username.is_none() && user.is_some() {
            debug!("使用来自{}的用户名", name);
            username = user;
            source = name.to_string();
        }
        if password.is_none() && pass.is_some() {
            debug!("使用来自{}的密码", name);
            password = pass;
        }
        username.is_some() && password.is_some()
    };

    let complete = take(
        non_empty(cli_username.map(str::to_string)),
        non_empty(cli_password.map(str::to_string)),
        "命令行参数",
    ) || take(
        non_empty(std::env::var(constants::env::USERNAME).ok()),
        non_empty(std::env::var(constants::env::PASSWORD).ok()),
        "环境变量",
    );
    if !complete {
        let (file_username, file_password) = load_credentials_from_config();
        take(non_empty(file_username), non_empty(file_password), "本地配置文件");
    }
    (username, password, source)
}
