// src/downloader/retry.rs

use crate::{constants, error::*};
use log::warn;
use std::future::Future;

/// 单个下载项的重试策略。重试是立即进行的，退避交给 HTTP 客户端的中间件。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    retryable: fn(&AppError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retryable: fn(&AppError) -> bool) -> Self {
        Self { max_attempts: max_attempts.max(1), retryable }
    }

    /// 单课程下载：只尝试一次
    pub fn single() -> Self {
        Self::new(1, |_| false)
    }

    /// 全量下载：网络类错误最多尝试三次
    pub fn bulk() -> Self {
        Self::new(constants::BULK_MAX_ATTEMPTS, AppError::is_network)
    }

    pub fn should_retry(&self, attempt: u32, err: &AppError) -> bool {
        attempt < self.max_attempts && (self.retryable)(err)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt, &e) => {
                    warn!("'{}' 第 {}/{} 次尝试失败: {}，立即重试", label, attempt, self.max_attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single()
    }
}
