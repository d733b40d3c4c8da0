// src/catalog.rs

//! 学期与课程目录。所有课程都以显式的 `CourseContext` 返回，不存在全局的“当前课程”。

use crate::{
    client::RobustClient,
    config::AppConfig,
    constants,
    error::*,
    extractor::{
        course_page::parse_course_page,
        courses::{parse_all_courses, parse_home_courses, parse_semester_form, SemesterListing},
        names,
    },
    models::{Course, CourseContext, CoursePage, Credential, Semester},
};
use itertools::Itertools;
use log::{debug, info, warn};
use std::sync::Arc;
use url::Url;

/// 页面请求失败 (非 2xx) 时返回空结果，认证失败等其他错误继续向上传播
fn empty_on_page_error<T: Default>(result: AppResult<T>) -> AppResult<T> {
    match result {
        Err(AppError::PageFetch { url, status }) => {
            warn!("页面 '{}' 获取失败 (状态码 {})，按空结果处理", url, status);
            Ok(T::default())
        }
        other => other,
    }
}

pub struct Catalog {
    http_client: Arc<RobustClient>,
    config: Arc<AppConfig>,
}

impl Catalog {
    pub fn new(http_client: Arc<RobustClient>, config: Arc<AppConfig>) -> Self {
        Self { http_client, config }
    }

    pub async fn login(&self, credential: &Credential) -> AppResult<()> {
        info!("正在验证用户 '{}' 的凭据", credential.username);
        self.http_client.login(credential).await
    }

    fn home_url(&self) -> String {
        self.config.portal_url(&self.config.portal.home_path)
    }

    async fn fetch_listings(&self, credential: &Credential) -> AppResult<Vec<SemesterListing>> {
        let url = self.config.portal_url(&self.config.portal.all_courses_path);
        let html = empty_on_page_error(self.http_client.get_html(&url, credential).await)?;
        let listings = parse_all_courses(&html);
        debug!("全部课程页共解析到 {} 个学期", listings.len());
        Ok(listings)
    }

    /// 首页学期下拉框中被选中的学期才是门户的当前学期
    async fn apply_home_selection(&self, credential: &Credential, listings: &mut [SemesterListing]) {
        let html = match self.http_client.get_html(&self.home_url(), credential).await {
            Ok(html) => html,
            Err(e) => {
                debug!("无法获取首页以确认当前学期: {}", e);
                return;
            }
        };
        let Some(selected) = parse_semester_form(&html).and_then(|form| form.selected().cloned()) else {
            return;
        };
        let label = names::normalize_semester_title(&selected.label);
        let position = listings
            .iter()
            .position(|l| l.semester.id == selected.value || l.semester.name == label);
        if let Some(position) = position {
            for (i, listing) in listings.iter_mut().enumerate() {
                listing.semester.is_current = i == position;
            }
        }
    }

    async fn listings_with_current(&self, credential: &Credential) -> AppResult<Vec<SemesterListing>> {
        let mut listings = self.fetch_listings(credential).await?;
        if !listings.is_empty() {
            self.apply_home_selection(credential, &mut listings).await;
        }
        Ok(listings)
    }

    pub async fn list_semesters(&self, credential: &Credential) -> AppResult<Vec<Semester>> {
        let listings = self.listings_with_current(credential).await?;
        Ok(listings.into_iter().map(|l| l.semester).collect())
    }

    /// 列出某学期的课程；未指定学期时使用当前学期。
    /// 全部课程页没有结果时，通过首页 (必要时先切换学期) 获取。
    pub async fn list_courses(
        &self,
        credential: &Credential,
        semester: Option<&Semester>,
    ) -> AppResult<Vec<Course>> {
        let listings = self.listings_with_current(credential).await?;
        let listing = match semester {
            Some(wanted) => listings
                .iter()
                .find(|l| l.semester.id == wanted.id && l.semester.name == wanted.name)
                .or_else(|| listings.iter().find(|l| l.semester.name == wanted.name)),
            None => listings.iter().find(|l| l.semester.is_current),
        };
        if let Some(listing) = listing
            && !listing.courses.is_empty()
        {
            return Ok(listing.courses.clone());
        }

        debug!("全部课程页中没有所需学期的课程，改用首页课程表");
        let html = match semester {
            Some(wanted) if !wanted.is_current => self.change_semester(credential, wanted).await?,
            _ => empty_on_page_error(self.http_client.get_html(&self.home_url(), credential).await)?,
        };
        Ok(parse_home_courses(&html))
    }

    /// 通过 ASP.NET 回发切换首页的当前学期，返回切换后的首页 HTML。
    pub async fn change_semester(&self, credential: &Credential, semester: &Semester) -> AppResult<String> {
        let home_url = self.home_url();
        let html = self.http_client.get_html(&home_url, credential).await?;
        let form = parse_semester_form(&html)
            .ok_or_else(|| AppError::SemesterChange("首页中没有学期选择表单".into()))?;
        if !form.has_view_state() {
            return Err(AppError::SemesterChange("学期表单缺少 __VIEWSTATE 字段".into()));
        }
        let option = form
            .find_option(semester)
            .ok_or_else(|| AppError::SemesterChange(format!("学期选项中没有 '{}'", semester.name)))?;
        if option.selected {
            debug!("学期 '{}' 已是当前学期，无需切换", semester.name);
            return Ok(html);
        }

        let target = match form.action.as_deref() {
            Some(action) => Url::parse(&home_url)?.join(action)?.to_string(),
            None => home_url,
        };
        info!("切换学期到 '{}' (值: {})", semester.name, option.value);
        self.http_client
            .post_form(&target, credential, &form.submission(&option.value))
            .await
    }

    pub fn course_page_url(&self, course: &Course) -> AppResult<String> {
        let mut url = Url::parse(&self.config.portal_url(&self.config.portal.course_view_path))?;
        url.query_pairs_mut()
            .append_pair("id", &course.id)
            .append_pair("sid", &course.sid);
        Ok(url.to_string())
    }

    fn context_for(&self, semester: &Semester, course: &Course) -> AppResult<CourseContext> {
        Ok(CourseContext {
            semester: semester.clone(),
            course: course.clone(),
            page_url: self.course_page_url(course)?,
        })
    }

    /// 在给定学期内按名称查找课程。名称先经过规范化，再依次尝试
    /// 精确匹配、忽略大小写匹配和唯一的子串匹配。
    pub async fn select_course(
        &self,
        credential: &Credential,
        semester: &Semester,
        name: &str,
    ) -> AppResult<CourseContext> {
        let courses = self.list_courses(credential, Some(semester)).await?;
        let wanted = names::normalize_course_name(name);
        let lowered = wanted.to_lowercase();

        let found = courses
            .iter()
            .find(|c| c.name == wanted)
            .or_else(|| courses.iter().find(|c| c.name.to_lowercase() == lowered))
            .or_else(|| {
                courses
                    .iter()
                    .filter(|c| c.name.to_lowercase().contains(&lowered))
                    .exactly_one()
                    .ok()
            });

        match found {
            Some(course) => self.context_for(semester, course),
            None => Err(AppError::CourseNotFound(format!("{} ({})", wanted, semester.name))),
        }
    }

    /// 所有学期的所有课程，每个 (学期, 课程) 组合只出现一次
    pub async fn all_course_contexts(&self, credential: &Credential) -> AppResult<Vec<CourseContext>> {
        let listings = self.listings_with_current(credential).await?;
        let pairs: Vec<(Semester, Course)> = if listings.is_empty() {
            self.home_page_pairs(credential).await?
        } else {
            listings
                .into_iter()
                .flat_map(|l| {
                    let semester = l.semester;
                    l.courses.into_iter().map(move |c| (semester.clone(), c))
                })
                .collect()
        };

        pairs
            .into_iter()
            .unique_by(|(s, c)| (s.id.clone(), s.name.clone(), c.id.clone(), c.name.clone()))
            .map(|(s, c)| self.context_for(&s, &c))
            .collect()
    }

    async fn home_page_pairs(&self, credential: &Credential) -> AppResult<Vec<(Semester, Course)>> {
        let html = empty_on_page_error(self.http_client.get_html(&self.home_url(), credential).await)?;
        let semester = parse_semester_form(&html)
            .and_then(|form| form.selected().cloned())
            .map(|option| Semester {
                id: option.value,
                name: names::normalize_semester_title(&option.label),
                is_current: true,
            })
            .unwrap_or_else(|| Semester {
                id: constants::layout::UNKNOWN_SEMESTER.to_string(),
                name: constants::layout::UNKNOWN_SEMESTER.to_string(),
                is_current: true,
            });
        Ok(parse_home_courses(&html)
            .into_iter()
            .map(|course| (semester.clone(), course))
            .collect())
    }

    /// 获取并解析课程内容页；页面请求失败时返回 `None`。
    pub async fn fetch_course_page(
        &self,
        credential: &Credential,
        context: &CourseContext,
    ) -> AppResult<Option<CoursePage>> {
        match self.http_client.get_html(&context.page_url, credential).await {
            Ok(html) => Ok(Some(parse_course_page(&html))),
            Err(AppError::PageFetch { url, status }) => {
                warn!("课程页 '{}' 获取失败 (状态码 {})", url, status);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 课程页中出现的内容类型 (按页面顺序去重)
    pub async fn available_types(
        &self,
        credential: &Credential,
        context: &CourseContext,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .fetch_course_page(credential, context)
            .await?
            .map(|page| page.available_types())
            .unwrap_or_default())
    }
}
