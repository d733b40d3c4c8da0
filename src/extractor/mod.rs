// src/extractor/mod.rs

pub mod classifier;
pub mod course_page;
pub mod courses;
pub mod names;

use scraper::ElementRef;

/// 各文本节点去掉首尾空白后以空格连接
pub(crate) fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 元素的原始文本，去掉首尾空白
pub(crate) fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn non_empty_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
