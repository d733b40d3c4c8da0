// src/cli.rs

use crate::{constants, models::OrgMode};
use clap::{Parser, ValueEnum, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["interactive", "list", "course", "all", "vod"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 启动交互式会话，通过菜单选择学期、课程和内容类型
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub interactive: bool,
    /// 列出所有学期及其课程
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub list: bool,
    /// 下载指定名称的课程 (默认在当前学期中查找)
    #[arg(long, value_name = "NAME", help_heading = "Mode")]
    pub course: Option<String>,
    /// 下载所有学期的所有课程
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub all: bool,
    /// 通过内容 ID 下载单个视频
    #[arg(long, value_name = "CONTENT_ID", help_heading = "Mode")]
    pub vod: Option<String>,

    // --- 下载选项 (Options) ---
    /// [课程模式] 仅列出课程中的内容类型并退出
    #[arg(
        long,
        action = clap::ArgAction::SetTrue,
        requires = "course",
        conflicts_with_all = ["interactive", "list", "all", "vod"],
        help_heading = "Options"
    )]
    pub show_types: bool,
    /// 指定学期名称或 ID
    #[arg(long, value_name = "SEMESTER", help_heading = "Options")]
    pub semester: Option<String>,
    /// 要下载的内容类型，逗号分隔 (例如 'Lecture slides,VoD')，或 'all'
    #[arg(long, default_value_t = constants::DEFAULT_SELECTION.to_string(), value_name = "TYPES", help_heading = "Options")]
    pub types: String,
    /// 文件组织方式
    #[arg(long, value_enum, default_value_t = OrgMode::Type, help_heading = "Options")]
    pub org_mode: OrgMode,
    /// 文件名中不包含周信息
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub no_week: bool,
    /// 文件名中包含内容类型
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub include_type: bool,
    /// 周文件夹名中包含周描述
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub week_description: bool,
    /// [视频模式] 输出文件名 (默认 Video_<ID>.mkv)
    #[arg(
        long,
        value_name = "FILE",
        requires = "vod",
        conflicts_with_all = ["interactive", "list", "course", "all"],
        help_heading = "Options"
    )]
    pub vod_name: Option<String>,
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", default_value_os_t = PathBuf::from(constants::DEFAULT_SAVE_DIR), help_heading = "Options")]
    pub output: PathBuf,
    /// 门户用户名，优先级最高
    #[arg(short, long, help_heading = "Options")]
    pub username: Option<String>,
    /// 门户密码，优先级最高
    #[arg(short, long, help_heading = "Options")]
    pub password: Option<String>,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
