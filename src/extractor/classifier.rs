// src/extractor/classifier.rs

//! 内容类型识别：按优先级依次尝试规则表中的每一条规则，第一条命中的规则给出类型。
//! 新增识别方式只需在 `RULES` 中追加一项。

use crate::constants::labels;
use regex::Regex;
use std::sync::LazyLock;

/// 规则函数接收 (去除首尾空白的原文, 小写形式)
type RuleFn = fn(&str, &str) -> Option<String>;

pub struct Rule {
    pub name: &'static str,
    apply: RuleFn,
}

pub static RULES: &[Rule] = &[
    Rule { name: "parenthesized", apply: last_parenthesized },
    Rule { name: "vod", apply: vod_keyword },
    Rule { name: "exam", apply: exam_keyword },
    Rule { name: "lab", apply: lab_keyword },
    Rule { name: "hyphen", apply: before_first_hyphen },
    Rule { name: "keyword", apply: keyword_sweep },
];

static VOD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bvod\b|video on demand").unwrap());
static EXAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bexams?\b|\bexamination").unwrap());
static LAB_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\blabs?\b|\blaborator").unwrap());
static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*-\s*").unwrap());

static KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"lecture", labels::LECTURE_SLIDES),
        (r"assignment|\bhw\b|homework", labels::ASSIGNMENTS),
        (r"tutorial|\btut", labels::TUTORIAL),
        (r"project", labels::PROJECT),
        (r"\bnote", labels::NOTES),
        (r"solution", labels::SOLUTIONS),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
    .collect()
});

/// 将卡片标题映射为规范化的内容类型，结果总是非空。
pub fn classify(text: &str) -> String {
    classify_with_rule(text).1
}

/// 同 [`classify`]，额外返回命中的规则名
pub fn classify_with_rule(text: &str) -> (&'static str, String) {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(trimmed, &lower).map(|label| (rule.name, label)))
        .unwrap_or(("default", labels::OTHERS.to_string()))
}

/// 最后一对括号中的内容（不是第一对：标题前部可能含课程代码）
pub fn last_parenthesized_content(text: &str) -> Option<&str> {
    let open = text.rfind('(')?;
    let close = text.rfind(')')?;
    if close <= open {
        return None;
    }
    Some(text[open + 1..close].trim()).filter(|inner| !inner.is_empty())
}

fn last_parenthesized(text: &str, _lower: &str) -> Option<String> {
    last_parenthesized_content(text).map(str::to_string)
}

fn vod_keyword(_text: &str, lower: &str) -> Option<String> {
    VOD_RE.is_match(lower).then(|| labels::VOD.to_string())
}

fn exam_keyword(_text: &str, lower: &str) -> Option<String> {
    if !EXAM_RE.is_match(lower) {
        return None;
    }
    Some(if lower.contains("solution") { labels::EXAM_SOLUTIONS } else { labels::EXAM }.to_string())
}

fn lab_keyword(_text: &str, lower: &str) -> Option<String> {
    if !LAB_RE.is_match(lower) {
        return None;
    }
    Some(if lower.contains("manual") { labels::LAB_MANUALS } else { labels::LAB }.to_string())
}

fn before_first_hyphen(text: &str, _lower: &str) -> Option<String> {
    // 序号前缀 "3 - " 不是类型
    let text = ORDINAL_RE.replace(text, "");
    let (head, _) = text.split_once('-')?;
    let head = head.trim();
    (!head.is_empty()).then(|| head.to_string())
}

fn keyword_sweep(_text: &str, lower: &str) -> Option<String> {
    KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(lower))
        .map(|(_, label)| label.to_string())
}
