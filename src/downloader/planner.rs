// src/downloader/planner.rs

use crate::{
    constants::layout,
    models::{ContentCard, CourseContext, CoursePage, DownloadTask, OrgMode, PlanOptions, TypeSelection},
    utils,
};
use log::{debug, trace};
use std::path::PathBuf;

/// 根据类型选择与组织方式，把课程页中的卡片转换为下载任务。
pub fn plan(
    page: &CoursePage,
    context: &CourseContext,
    selection: &TypeSelection,
    options: &PlanOptions,
) -> Vec<DownloadTask> {
    let course_dir = options
        .root
        .join(utils::sanitize_filename(context.semester.name.trim_end()))
        .join(utils::sanitize_filename(context.course.name.trim_end()));

    let tasks: Vec<DownloadTask> = page
        .cards
        .iter()
        .filter(|card| selection.matches(&card.content_type))
        .map(|card| {
            let extension = extension_for(card);
            let folder = match options.org_mode {
                OrgMode::Type => Some(type_folder(&card.content_type, selection)),
                OrgMode::Week => Some(
                    week_folder(card, options.include_week_description)
                        .unwrap_or_else(|| layout::NO_WEEK_DIR.to_string()),
                ),
                OrgMode::Flat => None,
            };
            let stem = utils::sanitize_filename(&file_stem(card, options));
            let mut destination: PathBuf = course_dir.clone();
            if let Some(folder) = folder {
                destination.push(utils::sanitize_filename(&folder));
            }
            destination.push(format!("{}.{}", stem, extension));
            trace!("'{}' -> {:?}", card.raw_title, destination);

            DownloadTask {
                card: card.clone(),
                destination,
                extension,
                semester_name: context.semester.name.clone(),
                course_name: context.course.name.clone(),
            }
        })
        .collect();

    debug!(
        "课程 '{}' 共 {} 张卡片，计划下载 {} 项",
        context.course.name,
        page.cards.len(),
        tasks.len()
    );
    tasks
}

fn extension_for(card: &ContentCard) -> String {
    if card.is_video {
        return layout::VIDEO_EXTENSION.to_string();
    }
    card.download_href
        .as_deref()
        .map(utils::extension_from_href)
        .unwrap_or_else(|| layout::UNKNOWN_EXTENSION.to_string())
}

/// `Week N`，开启描述且描述清理后非空时为 `Week N [描述]`
fn week_folder(card: &ContentCard, include_description: bool) -> Option<String> {
    let week = card.week_number?;
    let plain = format!("Week {}", week);
    let description = card
        .week_description
        .as_deref()
        .map(utils::sanitize_description)
        .filter(|d| !d.is_empty());
    Some(match description {
        Some(description) if include_description => format!("{} [{}]", plain, description),
        _ => plain,
    })
}

/// 第一个与检测到的类型互相包含 (忽略大小写) 的已选类型，否则使用检测到的类型
fn type_folder(detected: &str, selection: &TypeSelection) -> String {
    let detected_lower = detected.to_lowercase();
    let mapped = match selection {
        TypeSelection::All => None,
        TypeSelection::Labels(labels) => labels.iter().find(|label| {
            let label_lower = label.to_lowercase();
            label_lower.contains(&detected_lower) || detected_lower.contains(&label_lower)
        }),
    };
    mapped.map(String::as_str).unwrap_or(detected).trim_end().to_string()
}

fn file_stem(card: &ContentCard, options: &PlanOptions) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if options.include_week {
        let week_part = match options.org_mode {
            OrgMode::Week => card.week_number.map(|n| format!("Week {}", n)),
            OrgMode::Type | OrgMode::Flat => week_folder(card, options.include_week_description),
        };
        if let Some(week_part) = week_part {
            parts.push(week_part.trim_end().to_string());
        }
    }
    if options.include_type {
        parts.push(format!("({})", card.content_type.trim_end()));
    }
    parts.push(card.lecture_title.trim_end().to_string());
    parts.join(" - ").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Semester};
    use std::path::Path;

    fn context() -> CourseContext {
        CourseContext {
            semester: Semester { id: "65".into(), name: "Spring 2025".into(), is_current: true },
            course: Course { id: "175".into(), sid: "65".into(), name: "Computer Graphics (DMET502)".into() },
            page_url: "https://cms.example/course?id=175&sid=65".into(),
        }
    }

    fn card(title: &str, label: &str, week: Option<usize>, href: Option<&str>) -> ContentCard {
        ContentCard {
            raw_title: format!("{} ({})", title, label),
            content_type: label.into(),
            week_number: week,
            week_description: week.map(|n| format!("Topic: {}?", n)),
            lecture_title: title.into(),
            is_video: label == "VoD",
            download_href: href.map(str::to_string),
            video_content_id: (label == "VoD").then(|| "1234_abcd".to_string()),
        }
    }

    fn page() -> CoursePage {
        CoursePage {
            course_name: Some("Computer Graphics (DMET502)".into()),
            cards: vec![
                card("Intro to X", "Lecture slides", Some(2), Some("/Uploads/intro.pdf")),
                card("Recording", "VoD", Some(3), None),
                card("Syllabus", "Others", None, Some("/Uploads/syllabus")),
            ],
        }
    }

    #[test]
    fn test_type_mode_layout() {
        let options = PlanOptions::new("/root");
        let tasks = plan(&page(), &context(), &TypeSelection::All, &options);
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks[0].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/Lecture slides/Week 2 - Intro to X.pdf")
        );
        assert_eq!(
            tasks[1].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/VoD/Week 3 - Recording.mkv")
        );
        assert_eq!(
            tasks[2].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/Others/Syllabus.unknown")
        );
    }

    #[test]
    fn test_selection_filters_and_maps_type_folder() {
        let options = PlanOptions::new("/root");
        let selection = TypeSelection::from_labels(["lecture"]);
        let tasks = plan(&page(), &context(), &selection, &options);
        assert!(tasks.is_empty());

        let selection = TypeSelection::from_labels(["Lecture slides", "Others"]);
        let tasks = plan(&page(), &context(), &selection, &options);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.card.content_type != "VoD"));
    }

    #[test]
    fn test_type_folder_fuzzy_match() {
        let selection = TypeSelection::from_labels(["Lab Manuals"]);
        assert_eq!(type_folder("Lab", &selection), "Lab Manuals");
        assert_eq!(type_folder("Exam", &selection), "Exam");
        assert_eq!(type_folder("Exam", &TypeSelection::All), "Exam");
    }

    #[test]
    fn test_week_mode_with_description_and_type() {
        let mut options = PlanOptions::new("/root");
        options.org_mode = OrgMode::Week;
        options.include_type = true;
        options.include_week_description = true;
        let tasks = plan(&page(), &context(), &TypeSelection::All, &options);
        assert_eq!(
            tasks[0].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/Week 2 [Topic 2]/Week 2 - (Lecture slides) - Intro to X.pdf")
        );
        assert_eq!(
            tasks[2].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/No Week/(Others) - Syllabus.unknown")
        );
    }

    #[test]
    fn test_flat_mode_without_week() {
        let mut options = PlanOptions::new("/root");
        options.org_mode = OrgMode::Flat;
        options.include_week = false;
        let tasks = plan(&page(), &context(), &TypeSelection::All, &options);
        assert_eq!(
            tasks[0].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/Intro to X.pdf")
        );
        assert_eq!(tasks[0].extension, "pdf");
        assert_eq!(tasks[0].semester_name, "Spring 2025");
    }

    #[test]
    fn test_flat_mode_uses_described_week_prefix() {
        let mut options = PlanOptions::new("/root");
        options.org_mode = OrgMode::Flat;
        options.include_week_description = true;
        let tasks = plan(&page(), &context(), &TypeSelection::All, &options);
        assert_eq!(
            tasks[1].destination,
            Path::new("/root/Spring 2025/Computer Graphics (DMET502)/Week 3 [Topic 3] - Recording.mkv")
        );
    }
}
