// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use cms_dl::{
    cli::{Cli, LogLevel},
    constants,
    error::AppError,
    run_from_cli, symbols,
};
use colored::*;
use log::{error, info, warn};
use std::{
    env,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

fn init_logger(level: LogLevel) {
    if level == LogLevel::Off {
        return;
    }

    let app_name = clap::crate_name!();

    // 优先使用标准配置目录
    let log_file_path = match dirs::home_dir() {
        Some(home) => home.join(constants::CONFIG_DIR_NAME).join(constants::LOG_FILE_NAME),
        None => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir().join(app_name).join(constants::LOG_FILE_NAME)
        }
    };

    if let Some(dir) = log_file_path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(&log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("警告: 无法打开主日志文件 {:?} : {}。将尝试使用备用日志文件。", log_file_path, e);
            let fallback_path =
                env::temp_dir().join(format!("{}-{}", app_name, constants::LOG_FALLBACK_FILE_NAME));
            match fern::log_file(&fallback_path) {
                Ok(fb_file) => fb_file,
                Err(e_fb) => {
                    eprintln!(
                        "错误: 无法创建主日志和备用日志文件 {:?}: {}。日志将不会被记录到文件。",
                        fallback_path, e_fb
                    );
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(level.into())
        // 第三方库的日志过于冗长
        .level_for("html5ever", log::LevelFilter::Warn)
        .level_for("selectors", log::LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender)
        .apply();

    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }
    let after_help = format!(
        "示例:\n  # 启动交互模式 (推荐)\n  {bin} -i\n\n  # 列出所有学期与课程\n  {bin} --list\n\n  # 下载某门课程的课件与录像，按周组织\n  {bin} --course \"Computer Graphics\" --types \"Lecture slides,VoD\" --org-mode week\n\n  # 下载所有课程并记录调试日志\n  {bin} --all --log-level debug\n\n  # 通过内容 ID 下载单个视频\n  {bin} --vod 1234_abcd",
        bin = clap::crate_name!()
    );
    let cmd = Cli::command()
        .override_usage(format!("{} <MODE> [OPTIONS]", clap::crate_name!()))
        .after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };
    init_logger(args.log_level);

    let cancellation_token = Arc::new(AtomicBool::new(false));
    let handler_token = cancellation_token.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听 Ctrl-C 信号: {}", e);
                return;
            }
            if handler_token.load(Ordering::Relaxed) {
                println!("\n第二次中断，强制退出...");
                warn!("用户第二次按下 Ctrl+C，强制退出。");
                std::process::exit(130);
            }
            println!(
                "\n{} 正在停止... 当前文件完成后停止。再按一次 {} 可强制退出。",
                *symbols::WARN,
                *symbols::CTRL_C
            );
            warn!("用户通过 Ctrl+C 请求中断下载。");
            handler_token.store(true, Ordering::Relaxed);
        }
    });

    if let Err(e) = run_from_cli(args, cancellation_token).await {
        match e {
            AppError::UserInterrupt => {
                warn!("程序被用户中断。");
                std::process::exit(130);
            }
            AppError::AuthFailure | AppError::CredentialMissing => {
                error!("认证失败，程序退出: {}", e);
                eprintln!("\n{} {}", *symbols::ERROR, format!("{}", e).red());
                eprintln!(
                    "{} 可通过 -u/-p 参数、{}/{} 环境变量或配置文件提供登录凭据。",
                    *symbols::INFO,
                    constants::env::USERNAME,
                    constants::env::PASSWORD
                );
                std::process::exit(1);
            }
            _ => {
                error!("程序执行出错: {}", e);
                eprintln!("\n{} {}", *symbols::ERROR, format!("程序执行出错: {}", e).red());
                std::process::exit(1);
            }
        }
    }
    info!("程序正常退出。");
}
