// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const FILENAME_TRUNCATE_LENGTH: usize = 65;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "app.log";
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const DEFAULT_SELECTION: &str = "all";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 文档按固定大小分块写入并汇报进度
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;
/// 进度通道容量
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;
/// 批量下载时网络错误的最大尝试次数
pub const BULK_MAX_ATTEMPTS: u32 = 3;

pub mod env {
    pub const USERNAME: &str = "CMS_USERNAME";
    pub const PASSWORD: &str = "CMS_PASSWORD";
    pub const YTDLP_PATH: &str = "YTDLP_PATH";
    pub const FFMPEG_PATH: &str = "FFMPEG_PATH";
}

pub mod tools {
    pub const DEFAULT_YTDLP: &str = "yt-dlp";
    pub const DEFAULT_FFMPEG: &str = "ffmpeg";
}

pub mod status {
    pub const ALREADY_EXISTS: &str = "Already Exists";
    pub const DOWNLOADED: &str = "Downloaded";
    pub const VOD: &str = "VoD";
    pub const FAILED: &str = "Failed";
}

pub mod labels {
    pub const VOD: &str = "VoD";
    pub const EXAM: &str = "Exam";
    pub const EXAM_SOLUTIONS: &str = "Exam Solutions";
    pub const LAB: &str = "Lab";
    pub const LAB_MANUALS: &str = "Lab Manuals";
    pub const LECTURE_SLIDES: &str = "Lecture slides";
    pub const ASSIGNMENTS: &str = "Assignments";
    pub const TUTORIAL: &str = "Tutorial";
    pub const PROJECT: &str = "Project";
    pub const NOTES: &str = "Notes";
    pub const SOLUTIONS: &str = "Solutions";
    pub const OTHERS: &str = "Others";
}

pub mod layout {
    pub const NO_WEEK_DIR: &str = "No Week";
    pub const UNKNOWN_EXTENSION: &str = "unknown";
    pub const VIDEO_EXTENSION: &str = "mkv";
    pub const UNKNOWN_SEMESTER: &str = "Unknown Semester";
}

pub mod portal {
    pub const COURSE_NAME_LABEL: &str = "#ContentPlaceHolderright_ContentPlaceHoldercontent_LabelCourseName";
    pub const HOME_COURSES_TABLE: &str = "table#ContentPlaceHolderright_ContentPlaceHoldercontent_GridViewcourses";
    pub const VIEWSTATE_FIELDS: [&str; 3] = ["__VIEWSTATE", "__VIEWSTATEGENERATOR", "__EVENTVALIDATION"];
    pub const EVENT_TARGET: &str = "__EVENTTARGET";
    pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
}

pub mod video {
    /// 短 ID 的长度上限
    pub const SHORT_ID_MAX_LEN: usize = 50;
    pub const SHORT_ID_SEPARATOR: char = '_';
}
