// src/models/mod.rs

pub mod api;

use crate::symbols;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::PathBuf,
};

/// 登录凭据，随每个需要认证的请求一起传递
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 门户认证使用的完整用户名
    pub fn qualified_username(&self, auth_domain: Option<&str>) -> String {
        let user = self.username.trim();
        match auth_domain {
            Some(domain) if !domain.is_empty() && !user.contains('@') => format!("{}@{}", user, domain),
            _ => user.to_string(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: String,
    pub name: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    /// 学期 (session) ID
    pub sid: String,
    /// 规范化后的名称，形如 "Title (CODE)"
    pub name: String,
}

/// 某学期下的一个课程，以及访问其内容页所需的全部参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseContext {
    pub semester: Semester,
    pub course: Course,
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCard {
    pub raw_title: String,
    pub content_type: String,
    pub week_number: Option<usize>,
    pub week_description: Option<String>,
    pub lecture_title: String,
    pub is_video: bool,
    pub download_href: Option<String>,
    pub video_content_id: Option<String>,
}

/// 一次课程页抓取的结果
#[derive(Debug, Clone, Default)]
pub struct CoursePage {
    pub course_name: Option<String>,
    pub cards: Vec<ContentCard>,
}

impl CoursePage {
    /// 按页面顺序列出出现过的内容类型（去重）
    pub fn available_types(&self) -> Vec<String> {
        use itertools::Itertools;
        self.cards
            .iter()
            .map(|card| card.content_type.clone())
            .unique()
            .collect()
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OrgMode {
    /// <课程>/<类型>/<文件>
    #[default]
    Type,
    /// <课程>/<周>/<文件>
    Week,
    /// <课程>/<文件>
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelection {
    All,
    Labels(BTreeSet<String>),
}

impl TypeSelection {
    /// 解析逗号分隔的类型列表，"all" 表示全部
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("all") {
            return TypeSelection::All;
        }
        TypeSelection::Labels(
            input
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeSelection::Labels(labels.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            TypeSelection::All => true,
            TypeSelection::Labels(labels) => labels.contains(label.trim()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TypeSelection::Labels(labels) if labels.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub root: PathBuf,
    pub org_mode: OrgMode,
    pub include_week: bool,
    pub include_type: bool,
    pub include_week_description: bool,
}

impl PlanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            org_mode: OrgMode::Type,
            include_week: true,
            include_type: false,
            include_week_description: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub card: ContentCard,
    pub destination: PathBuf,
    pub extension: String,
    pub semester_name: String,
    pub course_name: String,
}

impl DownloadTask {
    pub fn display_name(&self) -> &str {
        &self.card.lecture_title
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    SkippedExists,
    Failed(String),
}

impl DownloadOutcome {
    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            DownloadOutcome::Downloaded => (&symbols::OK, |s| s.green(), "下载成功"),
            DownloadOutcome::SkippedExists => (&symbols::SKIP, |s| s.cyan(), "文件已存在，跳过"),
            DownloadOutcome::Failed(_) => (&symbols::ERROR, |s| s.red(), "下载失败"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub task: DownloadTask,
    pub outcome: DownloadOutcome,
    pub bytes_transferred: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    fn add(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::SkippedExists => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// 一次下载运行的汇总
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// 运行因认证失败而中止
    pub auth_failed: bool,
    pub bytes_transferred: u64,
    pub per_type: BTreeMap<String, OutcomeCounts>,
    pub per_semester: BTreeMap<String, OutcomeCounts>,
    pub results: Vec<DownloadResult>,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: DownloadResult) {
        match &result.outcome {
            DownloadOutcome::Downloaded => self.succeeded += 1,
            DownloadOutcome::SkippedExists => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
        self.bytes_transferred += result.bytes_transferred;
        self.per_type
            .entry(result.task.card.content_type.clone())
            .or_default()
            .add(&result.outcome);
        self.per_semester
            .entry(result.task.semester_name.clone())
            .or_default()
            .add(&result.outcome);
        self.results.push(result);
    }

    /// 合并另一次运行（例如全量下载中的下一门课程）
    pub fn merge(&mut self, other: RunSummary) {
        self.total += other.total;
        self.cancelled |= other.cancelled;
        self.auth_failed |= other.auth_failed;
        for result in other.results {
            self.record(result);
        }
    }

    /// 已完成（下载或跳过）的数量
    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped
    }

    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn did_all_succeed(&self) -> bool {
        self.failed == 0 && !self.cancelled && !self.auth_failed
    }
}

/// 从下载线程发往前端的进度消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
    pub item: String,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(label: &str, semester: &str) -> DownloadTask {
        DownloadTask {
            card: ContentCard {
                raw_title: format!("1 - Intro ({})", label),
                content_type: label.to_string(),
                week_number: Some(1),
                week_description: None,
                lecture_title: "Intro".into(),
                is_video: false,
                download_href: Some("/file.pdf".into()),
                video_content_id: None,
            },
            destination: PathBuf::from("out/Intro.pdf"),
            extension: "pdf".into(),
            semester_name: semester.into(),
            course_name: "Course (C1)".into(),
        }
    }

    #[test]
    fn test_type_selection_parse() {
        assert_eq!(TypeSelection::parse("ALL"), TypeSelection::All);
        let selection = TypeSelection::parse(" Lecture slides , VoD ,,");
        assert!(selection.matches("Lecture slides"));
        assert!(selection.matches("VoD"));
        assert!(!selection.matches("Exam"));
        assert!(TypeSelection::parse(" , ").is_empty());
    }

    #[test]
    fn test_summary_counts_per_type_and_semester() {
        let mut summary = RunSummary::new(3);
        summary.record(DownloadResult {
            task: task("VoD", "Winter 2024"),
            outcome: DownloadOutcome::Downloaded,
            bytes_transferred: 10,
        });
        summary.record(DownloadResult {
            task: task("VoD", "Spring 2025"),
            outcome: DownloadOutcome::SkippedExists,
            bytes_transferred: 0,
        });
        summary.record(DownloadResult {
            task: task("Lecture slides", "Winter 2024"),
            outcome: DownloadOutcome::Failed("boom".into()),
            bytes_transferred: 0,
        });

        assert_eq!((summary.succeeded, summary.skipped, summary.failed), (1, 1, 1));
        assert_eq!(summary.completed(), 2);
        assert_eq!(summary.bytes_transferred, 10);
        assert_eq!(summary.per_type["VoD"], OutcomeCounts { downloaded: 1, skipped: 1, failed: 0 });
        assert_eq!(summary.per_semester["Winter 2024"].failed, 1);
        assert!(!summary.did_all_succeed());
    }

    #[test]
    fn test_qualified_username() {
        let cred = Credential::new(" jane.doe ", "secret");
        assert_eq!(cred.qualified_username(Some("student.example.edu")), "jane.doe@student.example.edu");
        assert_eq!(cred.qualified_username(None), "jane.doe");
        assert!(!format!("{:?}", cred).contains("secret"));
    }
}
