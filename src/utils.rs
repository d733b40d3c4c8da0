// src/utils.rs

use crate::constants;
use regex::Regex;
use std::{collections::BTreeSet, ffi::OsStr, path::Path, sync::LazyLock};

static ILLEGAL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|\x00-\x1f]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// 周描述用于目录名：直接删除非法字符与控制字符
pub fn sanitize_description(text: &str) -> String {
    ILLEGAL_CHARS_RE.replace_all(text, "").trim().to_string()
}

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// 单个路径组件的清理：非法字符换成空格、折叠空白、去掉首尾的点，
/// Windows 保留名加前缀，超长时按 UTF-8 边界截断。
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }

    let stem = Path::new(trimmed)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(trimmed))
        .to_string_lossy()
        .to_uppercase();
    let reserved = WINDOWS_RESERVED.contains(&stem.as_str());

    let replaced = ILLEGAL_CHARS_RE.replace_all(trimmed, " ");
    let collapsed = collapse_whitespace(&replaced);
    let cleaned = collapsed.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        return "unnamed".to_string();
    }

    let name = if reserved { format!("_{}", cleaned) } else { cleaned.to_string() };
    if name.len() > constants::MAX_FILENAME_BYTES {
        safe_truncate_utf8(&name, constants::MAX_FILENAME_BYTES).trim_end().to_string()
    } else {
        name
    }
}

fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    let end = (0..=max_bytes.min(s.len())).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

/// 取链接最后一段路径的扩展名，没有则返回 "unknown"
pub fn extension_from_href(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let decoded = percent_encoding::percent_decode_str(segment).decode_utf8_lossy();
    let ext = decoded
        .rsplit_once('.')
        .map(|(_, ext)| sanitize_description(ext))
        .unwrap_or_default();
    if ext.is_empty() { constants::layout::UNKNOWN_EXTENSION.to_string() } else { ext }
}

/// 按显示宽度截断 (非 ASCII 字符按两格计)，超出时以 "..." 结尾
pub fn truncate_text(text: &str, max_width: usize) -> String {
    let budget = max_width.saturating_sub(3);
    let mut width = 0;
    let cut = text.char_indices().find_map(|(i, c)| {
        width += if c.is_ascii() { 1 } else { 2 };
        (width > budget).then_some(i)
    });
    match cut {
        Some(0) | None => text.to_string(),
        Some(end) => format!("{}...", &text[..end]),
    }
}

/// 解析菜单输入 ("1, 3, 5-7" 或 "all")，返回去重排序后的 0 基索引
pub fn parse_selection_indices(selection: &str, total_items: usize) -> Vec<usize> {
    if selection.trim().eq_ignore_ascii_case("all") {
        return (0..total_items).collect();
    }
    let in_range = |n: usize| (1..=total_items).contains(&n);
    let mut indices = BTreeSet::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => match (a.trim().parse::<usize>(), b.trim().parse::<usize>()) {
                (Ok(a), Ok(b)) if a > 0 && b > 0 => (a.min(b), a.max(b)),
                _ => continue,
            },
            None => match part.parse::<usize>() {
                Ok(n) => (n, n),
                Err(_) => continue,
            },
        };
        indices.extend((start..=end).filter(|&n| in_range(n)).map(|n| n - 1));
    }
    indices.into_iter().collect()
}

/// 下载进度文本，例如 "1.50 MB / 3.00 MB (50.0%)"
pub fn format_byte_progress(downloaded: u64, total: Option<u64>) -> String {
    let mb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0;
    match total {
        Some(total) if total > 0 => format!(
            "{:.2} MB / {:.2} MB ({:.1}%)",
            mb(downloaded),
            mb(total),
            downloaded as f64 / total as f64 * 100.0
        ),
        _ => format!("{:.2} MB / ? MB", mb(downloaded)),
    }
}
