// src/downloader/executor.rs

use super::{retry::RetryPolicy, video::VideoPipeline};
use crate::{
    client::RobustClient,
    config::AppConfig,
    constants::{self, status},
    error::*,
    models::{Credential, DownloadOutcome, DownloadResult, DownloadTask, ProgressEvent, RunSummary},
    utils,
};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::{
    fs,
    io::Write,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use url::Url;

/// 在每个下载项开始前轮询的取消检查
pub trait CancellationCheck: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancellationCheck for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> CancellationCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// 进度发送端。逐块的字节进度允许丢弃，终态消息必须送达。
struct Progress<'a> {
    sender: &'a mpsc::Sender<ProgressEvent>,
    done: usize,
    total: usize,
}

impl Progress<'_> {
    fn event(&self, item: &str, status: Option<String>) -> ProgressEvent {
        ProgressEvent { done: self.done, total: self.total, item: item.to_string(), status }
    }

    fn bytes(&self, item: &str, text: String) {
        let _ = self.sender.try_send(self.event(item, Some(text)));
    }

    async fn status(&self, item: &str, text: &str) {
        if self.sender.send(self.event(item, Some(text.to_string()))).await.is_err() {
            debug!("进度接收端已关闭");
        }
    }
}

/// 顺序执行一批下载任务
pub struct Executor {
    http_client: Arc<RobustClient>,
    config: Arc<AppConfig>,
    credential: Credential,
    video: Arc<VideoPipeline>,
    retry: RetryPolicy,
}

impl Executor {
    pub fn new(
        http_client: Arc<RobustClient>,
        config: Arc<AppConfig>,
        credential: Credential,
        video: Arc<VideoPipeline>,
        retry: RetryPolicy,
    ) -> Self {
        Self { http_client, config, credential, video, retry }
    }

    pub async fn execute(
        &self,
        tasks: &[DownloadTask],
        sender: &mpsc::Sender<ProgressEvent>,
        cancellation: &dyn CancellationCheck,
    ) -> RunSummary {
        let mut summary = RunSummary::new(tasks.len());
        let mut progress = Progress { sender, done: 0, total: tasks.len() };
        info!("开始执行 {} 个下载任务 (最多尝试 {} 次)", tasks.len(), self.retry.max_attempts);

        for task in tasks {
            if cancellation.is_cancelled() {
                warn!("下载已取消，剩余 {} 项未处理", tasks.len() - summary.attempted());
                summary.cancelled = true;
                break;
            }
            let result = self.process(task, &mut progress).await;
            let is_auth_failure = matches!(&result, Err(AppError::AuthFailure));
            summary.record(self.settle(task, result, &progress).await);
            if is_auth_failure {
                error!("认证失败，中止本次下载");
                summary.auth_failed = true;
                break;
            }
        }
        info!(
            "下载结束: 成功 {}，跳过 {}，失败 {}，取消: {}",
            summary.succeeded, summary.skipped, summary.failed, summary.cancelled
        );
        summary
    }

    async fn settle(
        &self,
        task: &DownloadTask,
        result: AppResult<(DownloadOutcome, u64)>,
        progress: &Progress<'_>,
    ) -> DownloadResult {
        let (outcome, bytes_transferred) = match result {
            Ok(value) => value,
            Err(e) => {
                error!("下载 '{}' 失败: {}", task.display_name(), e);
                progress.status(task.display_name(), status::FAILED).await;
                (DownloadOutcome::Failed(e.to_string()), 0)
            }
        };
        DownloadResult { task: task.clone(), outcome, bytes_transferred }
    }

    async fn process(&self, task: &DownloadTask, progress: &mut Progress<'_>) -> AppResult<(DownloadOutcome, u64)> {
        let name = task.display_name();
        if task.destination.exists() {
            debug!("文件已存在，跳过: {:?}", task.destination);
            progress.done += 1;
            progress.status(name, status::ALREADY_EXISTS).await;
            return Ok((DownloadOutcome::SkippedExists, 0));
        }
        if let Some(parent) = task.destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if task.card.is_video {
            let content_id = task
                .card
                .video_content_id
                .as_deref()
                .ok_or_else(|| AppError::MissingSource(format!("视频 '{}' 没有内容 ID", name)))?;
            self.video.download(content_id, &task.destination).await?;
            let size = fs::metadata(&task.destination).map(|m| m.len()).unwrap_or(0);
            progress.done += 1;
            progress.status(name, status::VOD).await;
            return Ok((DownloadOutcome::Downloaded, size));
        }

        let href = task
            .card
            .download_href
            .as_deref()
            .ok_or_else(|| AppError::MissingSource(format!("'{}' 没有下载链接", name)))?;
        let url = Url::parse(&self.config.portal.base_url)?.join(href)?;
        let reporter: &Progress<'_> = progress;
        let bytes = self
            .retry
            .run(name, |attempt| {
                if attempt > 1 {
                    debug!("第 {} 次请求 {}", attempt, url);
                }
                self.download_document(url.as_str(), &task.destination, name, reporter)
            })
            .await?;
        progress.done += 1;
        progress.status(name, status::DOWNLOADED).await;
        Ok((DownloadOutcome::Downloaded, bytes))
    }

    /// 流式下载到目标目录中的临时文件，完成后以不覆盖的方式落盘
    async fn download_document(
        &self,
        url: &str,
        destination: &Path,
        name: &str,
        progress: &Progress<'_>,
    ) -> AppResult<u64> {
        let res = self.http_client.get_file(url, &self.credential).await?;
        let total_size = res.content_length();
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;

        let mut downloaded: u64 = 0;
        let mut last_progress = utils::format_byte_progress(0, total_size);
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(constants::DOWNLOAD_CHUNK_SIZE) {
                file.write_all(piece)?;
                downloaded += piece.len() as u64;
                last_progress = utils::format_byte_progress(downloaded, total_size);
                progress.bytes(name, last_progress.clone());
            }
        }
        file.flush()?;
        progress.bytes(name, last_progress);

        file.persist_noclobber(destination)?;
        debug!("已保存 {:?} ({} 字节)", destination, downloaded);
        Ok(downloaded)
    }
}
