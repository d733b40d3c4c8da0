// src/extractor/course_page.rs

//! 课程内容页解析：周划分、周描述以及每张内容卡片。

use super::{classifier, joined_text, names, non_empty_attr, raw_text};
use crate::{
    constants,
    models::{ContentCard, CoursePage},
};
use log::{debug, trace};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::{collections::HashMap, sync::LazyLock};

static WEEK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".card.mb-5.weeksdata").unwrap());
static WEEK_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p.m-2.p2").unwrap());
static CONTENT_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div[id^=content]").unwrap());
static CARD_BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".card-body").unwrap());
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static LECTURE_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div strong").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static VOD_BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input.vodbutton").unwrap());
static COURSE_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(constants::portal::COURSE_NAME_LABEL).unwrap());

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*-\s*").unwrap());

/// 周编号与描述
#[derive(Debug, Default)]
struct WeekIndex {
    content_to_week: HashMap<String, usize>,
    descriptions: HashMap<usize, String>,
}

impl WeekIndex {
    fn build(document: &Html) -> Self {
        let mut index = WeekIndex::default();
        // 页面按从新到旧列出各周，反转后第 1 周为最早的一周
        let weeks: Vec<ElementRef<'_>> = document.select(&WEEK).collect();
        for (number, week) in (1..).zip(weeks.into_iter().rev()) {
            if let Some(description) = visible_description(week) {
                index.descriptions.insert(number, description);
            }
            for item in week.select(&CONTENT_ITEM) {
                if let Some(id) = non_empty_attr(item, "id") {
                    index.content_to_week.insert(id, number);
                }
            }
        }
        trace!("识别到 {} 周，{} 个内容条目", index.descriptions.len(), index.content_to_week.len());
        index
    }

    fn week_of(&self, card: ElementRef<'_>) -> Option<usize> {
        let own = card.select(&CONTENT_ITEM).next().and_then(|el| el.value().attr("id"));
        let ancestor = || {
            card.ancestors()
                .filter_map(ElementRef::wrap)
                .filter_map(|el| el.value().attr("id"))
                .find(|id| id.starts_with("content"))
        };
        own.or_else(ancestor)
            .and_then(|id| self.content_to_week.get(id).copied())
    }
}

fn is_hidden_div(element: ElementRef<'_>) -> bool {
    element.value().name() == "div"
        && element
            .value()
            .attr("style")
            .map(|style| style.replace(' ', "").to_lowercase().contains("display:none"))
            .unwrap_or(false)
}

/// 第一个不在隐藏 div 中的描述段落
fn visible_description(week: ElementRef<'_>) -> Option<String> {
    week.select(&WEEK_DESCRIPTION)
        .find(|p| !p.ancestors().filter_map(ElementRef::wrap).any(is_hidden_div))
        .map(raw_text)
        .filter(|text| !text.is_empty())
}

/// 卡片第一个 div 文本的第一行，包含类型标记与标题
fn card_heading(card: ElementRef<'_>) -> Option<String> {
    let div = card.select(&DIV).next()?;
    let text = raw_text(div);
    text.lines().next().map(|line| line.trim().to_string())
}

fn lecture_title(card: ElementRef<'_>, heading: &str, content_type: &str) -> String {
    let raw = card
        .select(&LECTURE_TITLE)
        .next()
        .map(joined_text)
        .unwrap_or_else(|| heading.to_string());
    let mut title = ORDINAL_RE.replace(raw.trim(), "").trim().to_string();
    let marker = format!("({})", content_type);
    if let Some(stripped) = title.strip_suffix(&marker) {
        title = stripped.trim_end().to_string();
    }
    title
}

fn parse_card(card: ElementRef<'_>, weeks: &WeekIndex) -> Option<ContentCard> {
    let heading = card_heading(card)?;
    if heading.is_empty() {
        return None;
    }
    let content_type = classifier::classify(&heading);
    let download_href = card
        .select(&LINK)
        .next()
        .and_then(|a| non_empty_attr(a, "href"));
    let video_content_id = card
        .select(&VOD_BUTTON)
        .next()
        .and_then(|input| non_empty_attr(input, "id"));
    let is_video = content_type.trim().eq_ignore_ascii_case(constants::labels::VOD)
        || (video_content_id.is_some() && download_href.is_none());

    let week_number = weeks.week_of(card);
    let week_description = week_number.and_then(|n| weeks.descriptions.get(&n).cloned());

    Some(ContentCard {
        lecture_title: lecture_title(card, &heading, &content_type),
        raw_title: heading,
        content_type,
        week_number,
        week_description,
        is_video,
        download_href,
        video_content_id,
    })
}

/// 解析课程内容页。结构不符合预期的卡片会被跳过，不会导致整个页面失败。
pub fn parse_course_page(html: &str) -> CoursePage {
    let document = Html::parse_document(html);
    let weeks = WeekIndex::build(&document);

    let course_name = document
        .select(&COURSE_NAME)
        .next()
        .map(|label| names::normalize_course_name(&raw_text(label)))
        .filter(|name| !name.is_empty());

    let cards: Vec<ContentCard> = document
        .select(&CARD_BODY)
        .filter_map(|card| parse_card(card, &weeks))
        .collect();

    debug!(
        "课程页 {:?} 解析到 {} 张内容卡片",
        course_name.as_deref().unwrap_or("?"),
        cards.len()
    );
    CoursePage { course_name, cards }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<span id="ContentPlaceHolderright_ContentPlaceHoldercontent_LabelCourseName">(|CSEN401|) Computer Programming Lab (428)</span>
<div class="card mb-5 weeksdata">
  <div style="display:none;"><p class="m-2 p2">hidden draft</p></div>
  <p class="m-2 p2">Recursion: part 2</p>
  <div id="content3">
    <div class="card-body">
      <div>2 - Recursion II (VoD)
        <strong>2 - Recursion II</strong>
      </div>
      <input class="vodbutton" id="1234_abcd" type="button" />
    </div>
  </div>
</div>
<div class="card mb-5 weeksdata">
  <p class="m-2 p2">Intro to X</p>
  <div id="content1">
    <div class="card-body">
      <div>1 - Intro to X (Lecture slides)
        <strong>1 - Intro to X</strong>
      </div>
      <a href="/Uploads/CSEN401/intro%20slides.pdf?v=2">download</a>
    </div>
  </div>
</div>
<div class="card-body">
  <div>Course Syllabus (Others)<strong>Course Syllabus</strong></div>
  <a href="/Uploads/syllabus">download</a>
</div>
</body></html>"#;

    #[test]
    fn test_weeks_are_numbered_oldest_first() {
        let page = parse_course_page(PAGE);
        assert_eq!(page.cards.len(), 3);

        let vod = &page.cards[0];
        assert_eq!(vod.week_number, Some(2));
        assert_eq!(vod.week_description.as_deref(), Some("Recursion: part 2"));

        let slides = &page.cards[1];
        assert_eq!(slides.week_number, Some(1));
        assert_eq!(slides.week_description.as_deref(), Some("Intro to X"));

        assert_eq!(page.cards[2].week_number, None);
        assert_eq!(page.cards[2].week_description, None);
    }

    #[test]
    fn test_week_numbers_follow_page_order_not_item_count() {
        let html = r#"
<div class="card mb-5 weeksdata">
  <div id="content30"><div class="card-body"><div>3 - C (Lecture slides)</div><a href="/c.pdf">x</a></div></div>
</div>
<div class="card mb-5 weeksdata">
  <div id="content20"><div class="card-body"><div>2 - B1 (Lecture slides)</div><a href="/b1.pdf">x</a></div></div>
  <div id="content21"><div class="card-body"><div>2 - B2 (Lecture slides)</div><a href="/b2.pdf">x</a></div></div>
  <div id="content22"><div class="card-body"><div>2 - B3 (Assignments)</div><a href="/b3.pdf">x</a></div></div>
</div>
<div class="card mb-5 weeksdata">
  <div id="content10"><div class="card-body"><div>1 - A1 (Lecture slides)</div><a href="/a1.pdf">x</a></div></div>
  <div id="content11"><div class="card-body"><div>1 - A2 (Lecture slides)</div><a href="/a2.pdf">x</a></div></div>
</div>"#;
        let page = parse_course_page(html);
        let weeks: Vec<(String, Option<usize>)> =
            page.cards.iter().map(|c| (c.lecture_title.clone(), c.week_number)).collect();
        assert_eq!(
            weeks,
            vec![
                ("C".to_string(), Some(3)),
                ("B1".to_string(), Some(2)),
                ("B2".to_string(), Some(2)),
                ("B3".to_string(), Some(2)),
                ("A1".to_string(), Some(1)),
                ("A2".to_string(), Some(1)),
            ]
        );
    }

    #[test]
    fn test_card_fields() {
        let page = parse_course_page(PAGE);
        assert_eq!(page.course_name.as_deref(), Some("Computer Programming Lab (CSEN401)"));

        let vod = &page.cards[0];
        assert_eq!(vod.content_type, "VoD");
        assert_eq!(vod.lecture_title, "Recursion II");
        assert!(vod.is_video);
        assert_eq!(vod.video_content_id.as_deref(), Some("1234_abcd"));
        assert_eq!(vod.download_href, None);

        let slides = &page.cards[1];
        assert_eq!(slides.raw_title, "1 - Intro to X (Lecture slides)");
        assert_eq!(slides.content_type, "Lecture slides");
        assert_eq!(slides.lecture_title, "Intro to X");
        assert!(!slides.is_video);
        assert_eq!(slides.download_href.as_deref(), Some("/Uploads/CSEN401/intro%20slides.pdf?v=2"));

        assert_eq!(page.available_types(), vec!["VoD", "Lecture slides", "Others"]);
    }

    #[test]
    fn test_empty_page_has_no_cards() {
        let page = parse_course_page("<html><body><p>nothing</p></body></html>");
        assert!(page.cards.is_empty());
        assert!(page.course_name.is_none());
    }
}
