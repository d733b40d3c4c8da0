// src/extractor/courses.rs

//! "全部课程" 页、首页课程表以及学期切换表单的解析。

use super::{joined_text, names, non_empty_attr, raw_text};
use crate::{
    constants,
    models::{Course, Semester},
};
use log::{debug, trace, warn};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static SEASON_CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.card-hover-shadow.profile-responsive.card-border.mb-3.card").unwrap()
});
static SEASON_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.menu-header-title").unwrap());
static CLASSED_TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table.table").unwrap());
static ANY_TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static TBODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static THEAD_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead tr").unwrap());
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static HOME_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(constants::portal::HOME_COURSES_TABLE).unwrap());
static HOME_TABLE_VARIANT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table[id$=GridViewcourses]").unwrap());
static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static HIDDEN_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type=hidden][name]").unwrap());
static SELECT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select[name]").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());

const NOT_AVAILABLE: &str = "N/A";

/// 一个学期及其课程
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterListing {
    pub semester: Semester,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    name: usize,
    id: Option<usize>,
    season: Option<usize>,
}

impl ColumnIndex {
    /// 旧版首页课程表的固定列位置
    const HOME_PAGE_LEGACY: ColumnIndex = ColumnIndex { name: 1, id: Some(4), season: Some(5) };

    fn from_headers(headers: &[String]) -> Option<Self> {
        let mut name = None;
        let mut id = None;
        let mut season = None;
        for (i, header) in headers.iter().enumerate() {
            if header.contains("SeasonId") {
                season.get_or_insert(i);
            } else if header.contains("Name") {
                name.get_or_insert(i);
            } else if header.contains("ID") {
                id.get_or_insert(i);
            }
        }
        name.map(|name| ColumnIndex { name, id, season })
    }

    fn max_index(&self) -> usize {
        [Some(self.name), self.id, self.season].into_iter().flatten().max().unwrap_or(0)
    }
}

/// 解析 "全部课程" 页面。主选择器找不到学期卡片时退回到全表扫描。
pub fn parse_all_courses(html: &str) -> Vec<SemesterListing> {
    let document = Html::parse_document(html);
    let mut listings = Vec::new();

    for card in document.select(&SEASON_CARD) {
        let title = card
            .select(&SEASON_TITLE)
            .next()
            .map(|div| names::normalize_semester_title(&raw_text(div)))
            .unwrap_or_else(|| constants::layout::UNKNOWN_SEMESTER.to_string());
        if title.is_empty() {
            continue;
        }
        let Some(table) = card.select(&CLASSED_TABLE).next().or_else(|| card.select(&ANY_TABLE).next()) else {
            debug!("学期 '{}' 下没有课程表", title);
            continue;
        };
        let courses = parse_course_table(table, None);
        trace!("学期 '{}' 解析到 {} 门课程", title, courses.len());
        listings.push(build_listing(title, courses));
    }

    if listings.is_empty() {
        debug!("未找到学期卡片，尝试扫描页面中的所有表格");
        listings = scan_tables(&document);
    }

    mark_first_current(&mut listings);
    listings
}

fn build_listing(title: String, courses: Vec<Course>) -> SemesterListing {
    let id = courses
        .iter()
        .map(|c| c.sid.as_str())
        .find(|sid| !sid.is_empty() && *sid != NOT_AVAILABLE)
        .unwrap_or(title.as_str())
        .to_string();
    SemesterListing {
        semester: Semester { id, name: title, is_current: false },
        courses,
    }
}

fn scan_tables(document: &Html) -> Vec<SemesterListing> {
    let mut listings: Vec<SemesterListing> = Vec::new();
    for table in document.select(&ANY_TABLE) {
        let courses = parse_course_table(table, None);
        if courses.is_empty() || courses.iter().all(|c| c.id == NOT_AVAILABLE) {
            continue;
        }
        for course in courses {
            let title = if course.sid == NOT_AVAILABLE {
                constants::layout::UNKNOWN_SEMESTER.to_string()
            } else {
                format!("Season {}", course.sid)
            };
            match listings.iter_mut().find(|l| l.semester.name == title) {
                Some(listing) => listing.courses.push(course),
                None => listings.push(build_listing(title, vec![course])),
            }
        }
    }
    listings
}

/// 门户按从新到旧排列学期，第一个即当前学期
fn mark_first_current(listings: &mut [SemesterListing]) {
    if let Some(first) = listings.first_mut() {
        first.semester.is_current = true;
    }
}

fn parse_course_table(table: ElementRef<'_>, fallback: Option<ColumnIndex>) -> Vec<Course> {
    let rows: Vec<ElementRef<'_>> = match table.select(&TBODY).next() {
        Some(tbody) => tbody.select(&ROW).collect(),
        None => table.select(&ROW).collect(),
    };
    if rows.is_empty() {
        return Vec::new();
    }

    // 没有 <thead> 时第一行就是表头
    let (headers, data_rows): (Vec<String>, Vec<ElementRef<'_>>) = match table.select(&THEAD_ROW).next() {
        Some(head) => (
            header_texts(head),
            rows.into_iter().filter(|row| row.id() != head.id()).collect(),
        ),
        None => (header_texts(rows[0]), rows[1..].to_vec()),
    };

    let Some(columns) = ColumnIndex::from_headers(&headers).or(fallback) else {
        trace!("表头 {:?} 中没有课程名称列", headers);
        return Vec::new();
    };

    data_rows
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&DATA_CELL).collect();
            if cells.len() <= columns.max_index() {
                return None;
            }
            let name = names::normalize_course_name(&joined_text(cells[columns.name]));
            if name.is_empty() {
                return None;
            }
            let cell = |idx: Option<usize>| {
                idx.map(|i| raw_text(cells[i]))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            };
            Some(Course { id: cell(columns.id), sid: cell(columns.season), name })
        })
        .collect()
}

fn header_texts(row: ElementRef<'_>) -> Vec<String> {
    row.select(&HEADER_CELL).map(raw_text).collect()
}

/// 解析首页 (当前学期) 的课程表
pub fn parse_home_courses(html: &str) -> Vec<Course> {
    let document = Html::parse_document(html);
    let table = document
        .select(&HOME_TABLE)
        .next()
        .or_else(|| document.select(&HOME_TABLE_VARIANT).next());
    match table {
        Some(table) => parse_course_table(table, Some(ColumnIndex::HOME_PAGE_LEGACY)),
        None => {
            warn!("首页中未找到课程表");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// 首页上用于切换学期的 ASP.NET 表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterForm {
    pub action: Option<String>,
    pub hidden_fields: Vec<(String, String)>,
    pub select_name: String,
    pub options: Vec<SemesterOption>,
}

impl SemesterForm {
    pub fn has_view_state(&self) -> bool {
        self.hidden_fields
            .iter()
            .any(|(name, _)| name == constants::portal::VIEWSTATE_FIELDS[0])
    }

    pub fn selected(&self) -> Option<&SemesterOption> {
        self.options.iter().find(|o| o.selected)
    }

    /// 按 ID 或名称查找学期选项
    pub fn find_option(&self, semester: &Semester) -> Option<&SemesterOption> {
        self.options
            .iter()
            .find(|o| o.value == semester.id)
            .or_else(|| {
                let wanted = names::normalize_semester_title(&semester.name);
                self.options
                    .iter()
                    .find(|o| names::normalize_semester_title(&o.label) == wanted)
            })
    }

    /// 构造回发数据：隐藏字段 + 事件目标 + 新选择的值
    pub fn submission(&self, value: &str) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .hidden_fields
            .iter()
            .filter(|(name, _)| {
                name != constants::portal::EVENT_TARGET && name != constants::portal::EVENT_ARGUMENT
            })
            .cloned()
            .collect();
        fields.push((constants::portal::EVENT_TARGET.to_string(), self.select_name.clone()));
        fields.push((constants::portal::EVENT_ARGUMENT.to_string(), String::new()));
        fields.push((self.select_name.clone(), value.to_string()));
        fields
    }
}

pub fn parse_semester_form(html: &str) -> Option<SemesterForm> {
    let document = Html::parse_document(html);
    let form = document.select(&FORM).next();
    let scope = form.unwrap_or_else(|| document.root_element());

    let selects: Vec<ElementRef<'_>> = scope.select(&SELECT).collect();
    let select = selects
        .iter()
        .find(|s| {
            let name = s.value().attr("name").unwrap_or_default().to_lowercase();
            let id = s.value().attr("id").unwrap_or_default().to_lowercase();
            name.contains("season") || id.contains("season") || name.contains("semester")
        })
        .or_else(|| selects.first())?;

    let options = select
        .select(&OPTION)
        .filter_map(|option| {
            let label = joined_text(option);
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());
            (!value.is_empty()).then(|| SemesterOption {
                value,
                label,
                selected: option.value().attr("selected").is_some(),
            })
        })
        .collect();

    let hidden_fields = scope
        .select(&HIDDEN_INPUT)
        .filter_map(|input| {
            let name = non_empty_attr(input, "name")?;
            let value = input.value().attr("value").unwrap_or_default().to_string();
            Some((name, value))
        })
        .collect();

    Some(SemesterForm {
        action: form.and_then(|f| non_empty_attr(f, "action")),
        hidden_fields,
        select_name: select.value().attr("name").unwrap_or_default().to_string(),
        options,
    })
}
