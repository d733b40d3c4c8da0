// src/extractor/names.rs

use crate::utils::collapse_whitespace;
use regex::Regex;
use std::sync::LazyLock;

static COURSE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\|([A-Za-z0-9 ]+)\|\)\s*([^(]+?)(?:\s*\([^)]*\))*$").unwrap()
});
static TRAILING_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(([^()]*)\)\s*$").unwrap());

/// 课程名规范化。任何页面得到的课程名都必须经过这里，跨页面查找依赖结果完全一致。
///
/// 1. `(|CODE|) Name (...)...` 形式 → `Name (CODE)`，代码统一大写，不含字母的代码丢弃；
/// 2. 否则去掉结尾的括号噪声（形如课程代码的括号组保留）；
/// 3. 折叠空白。
pub fn normalize_course_name(raw: &str) -> String {
    let raw = raw.trim();
    let clean = match COURSE_CODE_RE.captures(raw) {
        Some(caps) => {
            let code = caps[1].trim().to_uppercase();
            let name = caps[2].trim();
            // 纯数字代码在第二次规范化时会被当作噪声去掉，这里直接丢弃以保证结果稳定
            if !looks_like_course_code(&code) {
                name.to_string()
            } else {
                format!("{} ({})", name, code)
            }
        }
        None => strip_trailing_noise(raw),
    };
    collapse_whitespace(&clean)
}

fn strip_trailing_noise(name: &str) -> String {
    let mut current = name.trim_end().to_string();
    while let Some(caps) = TRAILING_GROUP_RE.captures(&current) {
        if looks_like_course_code(&caps[1]) {
            break;
        }
        let start = caps.get(0).map_or(current.len(), |m| m.start());
        current.truncate(start);
    }
    current
}

/// 保留下来的课程代码：只含字母数字和空格，至少一个字母，且含数字或全部大写
fn looks_like_course_code(inner: &str) -> bool {
    let inner = inner.trim();
    !inner.is_empty()
        && inner.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
        && inner.chars().any(|c| c.is_ascii_alphabetic())
        && (inner.chars().any(|c| c.is_ascii_digit()) || !inner.chars().any(|c| c.is_ascii_lowercase()))
}

/// 学期标题，例如 "Season : Winter 2024,  Title: X" → "Winter 2024 - X"
pub fn normalize_semester_title(raw: &str) -> String {
    let title = raw.replace("Season :", "").replace("Title:", "").replace(',', " -");
    collapse_whitespace(&title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_code_format() {
        assert_eq!(
            normalize_course_name("(|CSEN401|) Computer Programming Lab (428) (2)"),
            "Computer Programming Lab (CSEN401)"
        );
        assert_eq!(
            normalize_course_name("(|MATH 203|)   Mathematics   III"),
            "Mathematics III (MATH 203)"
        );
    }

    #[test]
    fn test_numeric_pipe_code_is_dropped() {
        assert_eq!(normalize_course_name("(|401|) Programming Lab (12)"), "Programming Lab");
        assert_eq!(normalize_course_name("(| 401 |) X"), "X");
    }

    #[test]
    fn test_fallback_strips_trailing_noise() {
        assert_eq!(normalize_course_name("Software Engineering (1234)"), "Software Engineering");
        assert_eq!(normalize_course_name("Physics (PHYS101) (7)"), "Physics (PHYS101)");
        assert_eq!(normalize_course_name("  Data\n Structures  "), "Data Structures");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let samples = [
            "(|CSEN401|) Computer Programming Lab (428)",
            "(|DMET 502|) Computer Graphics",
            "(|phys 1|) Physics (1)",
            "(|phys|) Physics (1)",
            "Software Engineering (1234)",
            "Intro (Lecture) (x) (y)",
            "Physics (PHYS101) (7)",
            "Plain Name",
            "   spaced    out   ",
            "(|ABC|)",
            "(|401|) Programming Lab",
            "(|401|) X",
        ];
        for sample in samples {
            let once = normalize_course_name(sample);
            assert_eq!(normalize_course_name(&once), once, "not idempotent for {:?}", sample);
            assert!(!once.contains("  "));
        }
    }

    #[test]
    fn test_semester_title() {
        assert_eq!(normalize_semester_title("Season : Winter 2024,  Title: Semester 7"), "Winter 2024 - Semester 7");
    }
}
