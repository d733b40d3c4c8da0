// src/workflows.rs

use crate::{
    AppContext,
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    constants::{self, status},
    downloader::{self, DownloadRunner, RetryPolicy, VideoPipeline, VideoResolver, YtDlpRemuxer},
    error::{AppError, AppResult},
    extractor::names,
    models::{CourseContext, DownloadOutcome, DownloadTask, RunSummary, Semester, TypeSelection},
    symbols, ui, utils,
};
use anyhow::anyhow;
use colored::*;
use itertools::Itertools;
use log::{info, warn};
use std::{
    fs,
    path::Path,
    sync::{Arc, atomic::Ordering},
};

fn announce_output_dir(root: &Path) -> AppResult<()> {
    fs::create_dir_all(root)?;
    let absolute_path = dunce::canonicalize(root)?;
    info!("文件将保存到目录: \"{}\"", absolute_path.display());
    println!("\n{} 文件将保存到目录: \"{}\"", *symbols::INFO, absolute_path.display());
    Ok(())
}

/// 列出所有学期及其课程
pub(crate) async fn run_list(context: AppContext) -> AppResult<()> {
    let contexts = context.catalog.all_course_contexts(&context.credential).await?;
    if contexts.is_empty() {
        ui::warn("未找到任何课程。");
        return Ok(());
    }
    for (semester, group) in &contexts.iter().chunk_by(|c| &c.semester) {
        let marker = if semester.is_current { " (当前)".green().to_string() } else { String::new() };
        ui::print_sub_header(&format!("{}{}", semester.name, marker));
        for (i, course_context) in group.enumerate() {
            println!("  [{}] {}", format!("{:>2}", i + 1).yellow(), course_context.course.name);
        }
    }
    Ok(())
}

/// 按名称或 ID 查找学期；未指定时使用当前学期
async fn resolve_semester(context: &AppContext, wanted: Option<&str>) -> AppResult<Semester> {
    let semesters = context.catalog.list_semesters(&context.credential).await?;
    match wanted {
        Some(wanted) => {
            let normalized = names::normalize_semester_title(wanted);
            semesters
                .iter()
                .find(|s| s.id == wanted || s.name == normalized)
                .or_else(|| {
                    let lowered = normalized.to_lowercase();
                    semesters.iter().find(|s| s.name.to_lowercase().contains(&lowered))
                })
                .cloned()
                .ok_or_else(|| AppError::UserInputError(format!("未找到学期 '{}'", wanted)))
        }
        None => Ok(semesters
            .iter()
            .find(|s| s.is_current)
            .or_else(|| semesters.first())
            .cloned()
            .unwrap_or_else(|| Semester {
                id: constants::layout::UNKNOWN_SEMESTER.to_string(),
                name: constants::layout::UNKNOWN_SEMESTER.to_string(),
                is_current: true,
            })),
    }
}

/// 下载单个课程 (或仅列出其内容类型)
pub(crate) async fn run_course(context: AppContext, name: &str) -> AppResult<()> {
    let semester = resolve_semester(&context, context.args.semester.as_deref()).await?;
    let course_context = context
        .catalog
        .select_course(&context.credential, &semester, name)
        .await?;
    ui::print_header(&format!("{} - {}", course_context.semester.name, course_context.course.name));

    if context.args.show_types {
        let types = context
            .catalog
            .available_types(&context.credential, &course_context)
            .await?;
        if types.is_empty() {
            ui::warn("该课程中没有可识别的内容。");
        }
        for label in types {
            println!("  - {}", label);
        }
        return Ok(());
    }

    announce_output_dir(&context.args.output)?;
    let selection = TypeSelection::parse(&context.args.types);
    let runner = DownloadRunner::new(Arc::new(context.executor(RetryPolicy::single())));
    let summary = download_course(&context, &runner, &course_context, &selection).await?;
    finish_run(&summary)
}

/// 所有学期的所有课程，网络错误按全量策略重试
pub(crate) async fn run_all(context: AppContext) -> AppResult<()> {
    let contexts = context.catalog.all_course_contexts(&context.credential).await?;
    ui::print_header(&format!("全量下载: 共 {} 门课程 (按 {} 可停止)", contexts.len(), *symbols::CTRL_C));

    announce_output_dir(&context.args.output)?;
    let selection = TypeSelection::parse(&context.args.types);
    let runner = DownloadRunner::new(Arc::new(context.executor(RetryPolicy::bulk())));
    let mut overall = RunSummary::default();
    for (i, course_context) in contexts.iter().enumerate() {
        if context.cancellation_token.load(Ordering::Relaxed) {
            overall.cancelled = true;
            break;
        }
        ui::print_sub_header(&format!(
            "课程 {}/{} - {} / {}",
            i + 1,
            contexts.len(),
            course_context.semester.name,
            utils::truncate_text(&course_context.course.name, constants::FILENAME_TRUNCATE_LENGTH)
        ));
        let summary = download_course(&context, &runner, course_context, &selection).await?;
        let stop = summary.auth_failed;
        overall.merge(summary);
        if stop {
            break;
        }
    }
    finish_run(&overall)
}

/// 交互模式：依次选择学期、课程和内容类型
pub(crate) async fn run_interactive(context: AppContext) -> AppResult<()> {
    ui::print_header("交互模式");
    ui::plain(&format!("依次选择学期、课程与内容类型。按 {} 可随时退出。", *symbols::CTRL_C));
    let runner = DownloadRunner::new(Arc::new(context.executor(RetryPolicy::single())));

    loop {
        let semesters = context.catalog.list_semesters(&context.credential).await?;
        if semesters.is_empty() {
            ui::warn("未找到任何学期。");
            return Ok(());
        }
        let labels: Vec<String> = semesters
            .iter()
            .map(|s| if s.is_current { format!("{} (当前)", s.name) } else { s.name.clone() })
            .collect();
        let default_index = semesters.iter().position(|s| s.is_current).unwrap_or(0) + 1;
        let Some(semester) = ui::pick_one(&labels, "选择学期", default_index).map(|i| &semesters[i]) else {
            break;
        };

        let courses = context
            .catalog
            .list_courses(&context.credential, Some(semester))
            .await?;
        let course_labels: Vec<String> = courses.iter().map(|c| c.name.clone()).collect();
        let Some(course) = ui::pick_one(&course_labels, "选择课程", 1).map(|i| &courses[i]) else {
            continue;
        };
        let course_context = context
            .catalog
            .select_course(&context.credential, semester, &course.name)
            .await?;

        let Some(page) = context
            .catalog
            .fetch_course_page(&context.credential, &course_context)
            .await?
        else {
            ui::warn("无法获取课程页面。");
            continue;
        };
        let types = page.available_types();
        let chosen = ui::pick_many(&types, "选择内容类型", constants::DEFAULT_SELECTION);
        if chosen.is_empty() {
            ui::info("未选择任何类型。");
        } else {
            let tasks = downloader::plan(
                &page,
                &course_context,
                &TypeSelection::from_labels(chosen),
                &context.plan_options(),
            );
            let summary = drive(&runner, tasks, &context).await?;
            downloader::print_report(&summary);
            if summary.cancelled {
                return Err(AppError::UserInterrupt);
            }
        }

        if !ui::confirm("是否继续下载其他课程?", true) {
            break;
        }
    }
    println!("\n{} 退出交互模式。", *symbols::INFO);
    Ok(())
}

/// 单个视频下载，不需要登录
pub(crate) async fn run_vod(
    args: &Cli,
    config: Arc<AppConfig>,
    http_client: Arc<RobustClient>,
    content_id: &str,
) -> AppResult<()> {
    let file_name = args
        .vod_name
        .clone()
        .unwrap_or_else(|| format!("Video_{}.{}", content_id, constants::layout::VIDEO_EXTENSION));
    let destination = args.output.join(utils::sanitize_filename(&file_name));
    if destination.exists() {
        println!("{} 文件已存在，跳过: {}", *symbols::SKIP, destination.display());
        return Ok(());
    }
    announce_output_dir(&args.output)?;

    ui::info(&format!("正在下载视频 '{}' ...", content_id));
    let pipeline = VideoPipeline::new(
        VideoResolver::new(http_client, config.clone()),
        Arc::new(YtDlpRemuxer::new(config.tools.clone())),
    );
    pipeline.download(content_id, &destination).await?;
    info!("视频 '{}' 已保存到 {:?}", content_id, destination);
    println!("{} 视频已保存: {}", *symbols::OK, destination.display());
    Ok(())
}

async fn download_course(
    context: &AppContext,
    runner: &DownloadRunner,
    course_context: &CourseContext,
    selection: &TypeSelection,
) -> AppResult<RunSummary> {
    let Some(page) = context
        .catalog
        .fetch_course_page(&context.credential, course_context)
        .await?
    else {
        ui::warn(&format!("无法获取课程 '{}' 的页面，跳过。", course_context.course.name));
        return Ok(RunSummary::default());
    };
    let tasks = downloader::plan(&page, course_context, selection, &context.plan_options());
    if tasks.is_empty() {
        ui::info("没有符合所选类型的内容。");
        return Ok(RunSummary::default());
    }
    drive(runner, tasks, context).await
}

/// 启动一次运行，并把进度消息绘制到进度条上
async fn drive(runner: &DownloadRunner, tasks: Vec<DownloadTask>, context: &AppContext) -> AppResult<RunSummary> {
    let pbar = ui::new_tasks_progress_bar(tasks.len() as u64, "下载");
    let mut handle = runner.start(tasks, context.cancellation_token.clone())?;

    while let Some(event) = handle.next_event().await {
        pbar.set_position(event.done as u64);
        let status_text = event.status.as_deref().unwrap_or_default();
        let outcome = match status_text {
            status::DOWNLOADED | status::VOD => Some(DownloadOutcome::Downloaded),
            status::ALREADY_EXISTS => Some(DownloadOutcome::SkippedExists),
            status::FAILED => Some(DownloadOutcome::Failed(String::new())),
            _ => None,
        };
        match outcome {
            Some(outcome) => {
                let (symbol, color_fn, message) = outcome.get_display_info();
                pbar.println(format!(
                    "{} {} {}",
                    symbol,
                    utils::truncate_text(&event.item, constants::FILENAME_TRUNCATE_LENGTH),
                    color_fn(message.into())
                ));
            }
            None => pbar.set_message(format!(
                "{} {}",
                utils::truncate_text(&event.item, constants::FILENAME_TRUNCATE_LENGTH / 2),
                status_text
            )),
        }
    }
    pbar.finish_and_clear();
    handle.finish().await
}

/// 打印报告，并把失败或取消转换为进程错误
fn finish_run(summary: &RunSummary) -> AppResult<()> {
    downloader::print_report(summary);
    if summary.auth_failed {
        return Err(AppError::AuthFailure);
    }
    if summary.cancelled {
        warn!("下载被用户取消");
        return Err(AppError::UserInterrupt);
    }
    if summary.failed > 0 {
        return Err(AppError::Other(anyhow!("{} 个文件下载失败", summary.failed)));
    }
    Ok(())
}
