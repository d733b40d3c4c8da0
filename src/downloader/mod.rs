// src/downloader/mod.rs

mod executor;
mod planner;
mod retry;
mod runner;
mod video;

pub use executor::{CancellationCheck, Executor};
pub use planner::plan;
pub use retry::RetryPolicy;
pub use runner::{DownloadRunner, RunHandle};
pub use video::{MediaRemuxer, VideoPipeline, VideoResolver, YtDlpRemuxer, is_short_id};

use crate::{
    models::{DownloadOutcome, RunSummary},
    symbols, ui,
};
use colored::*;
use indicatif::HumanBytes;
use log::info;
use std::collections::BTreeMap;

/// 打印一次运行的汇总报告
pub fn print_report(summary: &RunSummary) {
    info!(
        "下载报告: Total={}, Success={}, Skipped={}, Failed={}, Cancelled={}",
        summary.total, summary.succeeded, summary.skipped, summary.failed, summary.cancelled
    );

    let failed: Vec<(String, String)> = summary
        .results
        .iter()
        .filter_map(|r| match &r.outcome {
            DownloadOutcome::Failed(reason) => Some((r.task.destination.display().to_string(), reason.clone())),
            _ => None,
        })
        .collect();
    if !failed.is_empty() {
        ui::print_sub_header("失败详情");
        print_grouped_report(&failed, |s| s.red());
    }

    if summary.per_type.len() > 1 {
        ui::print_sub_header("按类型统计");
        for (label, counts) in &summary.per_type {
            println!(
                "  {:<20} 成功 {} / 跳过 {} / 失败 {}",
                label, counts.downloaded, counts.skipped, counts.failed
            );
        }
    }
    if summary.per_semester.len() > 1 {
        ui::print_sub_header("按学期统计");
        for (semester, counts) in &summary.per_semester {
            println!(
                "  {:<28} 成功 {} / 跳过 {} / 失败 {}",
                semester, counts.downloaded, counts.skipped, counts.failed
            );
        }
    }

    ui::print_sub_header("任务总结");
    if summary.cancelled {
        println!(
            "{} 下载已取消，{} 项中已处理 {} 项。",
            *symbols::WARN,
            summary.total,
            summary.attempted()
        );
    }
    if summary.auth_failed {
        println!("{} 认证失败，下载已中止。", *symbols::ERROR);
    }
    if summary.total > 0 && summary.did_all_succeed() {
        println!(
            "{} 所有 {} 个任务均已完成 ({} 个已跳过，共 {})。",
            *symbols::OK,
            summary.total,
            summary.skipped,
            HumanBytes(summary.bytes_transferred)
        );
    } else {
        println!(
            "{} | {} | {} | {}",
            format!("成功: {}", summary.succeeded).green(),
            format!("失败: {}", summary.failed).red(),
            format!("跳过: {}", summary.skipped).yellow(),
            HumanBytes(summary.bytes_transferred)
        );
    }
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let mut grouped: BTreeMap<&String, Vec<&String>> = BTreeMap::new();
    for (filename, reason) in items {
        grouped.entry(reason).or_default().push(filename);
    }
    for (reason, mut filenames) in grouped {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        filenames.sort();
        for filename in filenames {
            println!("    - {}", filename);
        }
    }
}
