// src/downloader/runner.rs

use super::executor::Executor;
use crate::{
    constants,
    error::*,
    models::{DownloadTask, ProgressEvent, RunSummary},
};
use anyhow::anyhow;
use log::{debug, info};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{sync::mpsc, task::JoinHandle};

/// 运行结束 (包括 panic) 时释放忙碌标记
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 在独立的 tokio 任务中执行下载，同一时间只允许一个运行
pub struct DownloadRunner {
    executor: Arc<Executor>,
    busy: Arc<AtomicBool>,
}

/// 正在进行的一次运行
pub struct RunHandle {
    events: mpsc::Receiver<ProgressEvent>,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// 运行结束且所有消息都被取走后返回 `None`
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub async fn finish(self) -> AppResult<RunSummary> {
        drop(self.events);
        self.join
            .await
            .map_err(|e| AppError::Other(anyhow!("下载任务异常退出: {}", e)))
    }
}

impl DownloadRunner {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor, busy: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn start(&self, tasks: Vec<DownloadTask>, cancel: Arc<AtomicBool>) -> AppResult<RunHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::RunInProgress);
        }
        let guard = BusyGuard(self.busy.clone());
        let (sender, events) = mpsc::channel(constants::PROGRESS_CHANNEL_CAPACITY);
        let executor = self.executor.clone();
        let flag = cancel.clone();

        info!("启动下载运行，共 {} 项", tasks.len());
        let join = tokio::spawn(async move {
            let _guard = guard;
            let summary = executor.execute(&tasks, &sender, flag.as_ref()).await;
            debug!("下载运行结束");
            summary
        });

        Ok(RunHandle { events, cancel, join })
    }
}
