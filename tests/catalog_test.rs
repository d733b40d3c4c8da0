// tests/catalog_test.rs

use cms_dl::{
    catalog::Catalog,
    client::RobustClient,
    config::AppConfig,
    downloader,
    error::AppError,
    models::{Credential, OrgMode, PlanOptions, Semester, TypeSelection},
};
use mockito::{Matcher, Server, ServerGuard};
use std::{fs, path::Path, sync::Arc};

const ALL_COURSES_PATH: &str = "/apps/student/ViewAllCourseStn";
const HOME_PATH: &str = "/apps/student/HomePageStn.aspx";
const COURSE_VIEW_PATH: &str = "/apps/student/CourseViewStn.aspx";
const SEASON_SELECT: &str = "ctl00$ContentPlaceHolderright$ContentPlaceHoldercontent$DropDownListSeason";

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("无法读取测试文件 {:?}: {}", path, e))
}

fn catalog_for(server: &ServerGuard) -> Catalog {
    let mut config = AppConfig::default();
    config.portal.base_url = server.url();
    config.portal.login_url = format!("{}/login", server.url());
    let config = Arc::new(config);
    let client = Arc::new(RobustClient::new(config.clone()).expect("Failed to create client"));
    Catalog::new(client, config)
}

fn credential() -> Credential {
    Credential::new("jane.doe", "secret")
}

fn winter() -> Semester {
    Semester { id: "59".into(), name: "Winter 2024".into(), is_current: false }
}

fn spring() -> Semester {
    Semester { id: "65".into(), name: "Spring 2025 - Semester 8".into(), is_current: false }
}

#[tokio::test]
async fn test_list_semesters_marks_home_selection_as_current() {
    // --- Arrange ---
    let mut server = Server::new_async().await;
    let all_courses = server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    let home = server
        .mock("GET", HOME_PATH)
        .with_status(200)
        .with_body(fixture("home_page.html"))
        .create_async()
        .await;
    let catalog = catalog_for(&server);

    // --- Act ---
    let semesters = catalog.list_semesters(&credential()).await.unwrap();

    // --- Assert ---
    all_courses.assert_async().await;
    home.assert_async().await;
    assert_eq!(semesters.len(), 2);
    assert_eq!(semesters[0].name, "Spring 2025 - Semester 8");
    assert_eq!(semesters[0].id, "65");
    // 首页下拉框选中的是 Winter 2024
    assert!(!semesters[0].is_current);
    assert!(semesters[1].is_current);
    assert_eq!(semesters.iter().filter(|s| s.is_current).count(), 1);
}

#[tokio::test]
async fn test_list_semesters_keeps_first_card_current_without_home_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    let catalog = catalog_for(&server);

    let semesters = catalog.list_semesters(&credential()).await.unwrap();

    assert!(semesters[0].is_current);
    assert!(!semesters[1].is_current);
}

#[tokio::test]
async fn test_list_semesters_is_empty_when_page_fails() {
    let mut server = Server::new_async().await;
    server.mock("GET", ALL_COURSES_PATH).with_status(500).create_async().await;
    let catalog = catalog_for(&server);

    let semesters = catalog.list_semesters(&credential()).await.unwrap();

    assert!(semesters.is_empty());
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_failure() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/login").with_status(401).create_async().await;
    server.mock("GET", ALL_COURSES_PATH).with_status(401).create_async().await;
    let catalog = catalog_for(&server);

    let login = catalog.login(&credential()).await;
    let listing = catalog.list_semesters(&credential()).await;

    assert!(matches!(login, Err(AppError::AuthFailure)));
    assert!(matches!(listing, Err(AppError::AuthFailure)));
}

#[tokio::test]
async fn test_login_succeeds_on_200() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("GET", "/login")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .with_status(200)
        .with_body("<html>Welcome</html>")
        .create_async()
        .await;
    let catalog = catalog_for(&server);

    catalog.login(&credential()).await.unwrap();

    login.assert_async().await;
}

#[tokio::test]
async fn test_select_course_is_scoped_to_semester() {
    // --- Arrange ---
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    let catalog = catalog_for(&server);

    // --- Act ---
    // 同名课程在两个学期中都存在
    let in_spring = catalog
        .select_course(&credential(), &spring(), "(|DMET502|) Computer Graphics")
        .await
        .unwrap();
    let in_winter = catalog
        .select_course(&credential(), &winter(), "computer graphics (dmet502)")
        .await
        .unwrap();

    // --- Assert ---
    assert_eq!(in_spring.course.name, "Computer Graphics (DMET502)");
    assert_eq!((in_spring.course.id.as_str(), in_spring.course.sid.as_str()), ("2672", "65"));
    assert_eq!(in_spring.semester, spring());
    assert_eq!(
        in_spring.page_url,
        format!("{}{}?id=2672&sid=65", server.url(), COURSE_VIEW_PATH)
    );

    assert_eq!((in_winter.course.id.as_str(), in_winter.course.sid.as_str()), ("2001", "59"));
    assert_eq!(in_winter.semester.name, "Winter 2024");
}

#[tokio::test]
async fn test_select_course_unknown_name_is_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    let catalog = catalog_for(&server);

    let result = catalog.select_course(&credential(), &spring(), "Quantum Basket Weaving").await;

    match result {
        Err(AppError::CourseNotFound(message)) => assert!(message.contains("Spring 2025")),
        other => panic!("期望 CourseNotFound，实际为 {:?}", other),
    }
}

#[tokio::test]
async fn test_all_course_contexts_are_distinct() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    let catalog = catalog_for(&server);

    let contexts = catalog.all_course_contexts(&credential()).await.unwrap();

    // 冬季学期中重复的一行只保留一次
    assert_eq!(contexts.len(), 4);
    let winter_graphics = contexts
        .iter()
        .filter(|c| c.semester.id == "59" && c.course.name == "Computer Graphics (DMET502)")
        .count();
    assert_eq!(winter_graphics, 1);
}

#[tokio::test]
async fn test_list_courses_switches_semester_on_home_page() {
    // --- Arrange ---
    // 全部课程页不可用，只能通过首页回发切换学期
    let mut server = Server::new_async().await;
    server.mock("GET", ALL_COURSES_PATH).with_status(404).create_async().await;
    let home = server
        .mock("GET", HOME_PATH)
        .with_status(200)
        .with_body(fixture("home_page.html"))
        .create_async()
        .await;
    let postback = server
        .mock("POST", HOME_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("__VIEWSTATE".into(), "vs==".into()),
            Matcher::UrlEncoded("__EVENTVALIDATION".into(), "ev==".into()),
            Matcher::UrlEncoded("__EVENTTARGET".into(), SEASON_SELECT.into()),
            Matcher::UrlEncoded(SEASON_SELECT.into(), "65".into()),
        ]))
        .with_status(200)
        .with_body(fixture("home_page_switched.html"))
        .expect(1)
        .create_async()
        .await;
    let catalog = catalog_for(&server);

    // --- Act ---
    let courses = catalog.list_courses(&credential(), Some(&spring())).await.unwrap();

    // --- Assert ---
    home.assert_async().await;
    postback.assert_async().await;
    let names: Vec<&str> = courses.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Computer Programming Lab (CSEN401)", "Computer Graphics (DMET502)"]);
    assert!(courses.iter().all(|c| c.sid == "65"));
}

#[tokio::test]
async fn test_change_semester_skips_postback_when_already_selected() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", HOME_PATH)
        .with_status(200)
        .with_body(fixture("home_page.html"))
        .create_async()
        .await;
    let postback = server.mock("POST", HOME_PATH).expect(0).create_async().await;
    let catalog = catalog_for(&server);

    let html = catalog.change_semester(&credential(), &winter()).await.unwrap();

    postback.assert_async().await;
    assert!(html.contains("vs=="));
}

#[tokio::test]
async fn test_change_semester_without_form_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", HOME_PATH)
        .with_status(200)
        .with_body("<html><body><p>maintenance</p></body></html>")
        .create_async()
        .await;
    let catalog = catalog_for(&server);

    let result = catalog.change_semester(&credential(), &spring()).await;

    assert!(matches!(result, Err(AppError::SemesterChange(_))));
}

#[tokio::test]
async fn test_fetch_course_page_failure_is_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    server
        .mock("GET", COURSE_VIEW_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let catalog = catalog_for(&server);
    let context = catalog
        .select_course(&credential(), &spring(), "Computer Graphics")
        .await
        .unwrap();

    let page = catalog.fetch_course_page(&credential(), &context).await.unwrap();
    let types = catalog.available_types(&credential(), &context).await.unwrap();

    assert!(page.is_none());
    assert!(types.is_empty());
}

#[tokio::test]
async fn test_course_page_feeds_planner() {
    // --- Arrange ---
    let mut server = Server::new_async().await;
    server
        .mock("GET", ALL_COURSES_PATH)
        .with_status(200)
        .with_body(fixture("all_courses.html"))
        .create_async()
        .await;
    server.mock("GET", HOME_PATH).with_status(404).create_async().await;
    let course_page = server
        .mock("GET", COURSE_VIEW_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "2672".into()),
            Matcher::UrlEncoded("sid".into(), "65".into()),
        ]))
        .with_status(200)
        .with_body(fixture("course_page.html"))
        .create_async()
        .await;
    let catalog = catalog_for(&server);
    let context = catalog
        .select_course(&credential(), &spring(), "Computer Graphics")
        .await
        .unwrap();

    // --- Act ---
    let page = catalog
        .fetch_course_page(&credential(), &context)
        .await
        .unwrap()
        .expect("course page");
    let options = PlanOptions::new("/root");
    let slides = downloader::plan(&page, &context, &TypeSelection::parse("Lecture slides"), &options);
    let everything = downloader::plan(&page, &context, &TypeSelection::All, &options);
    let by_week = downloader::plan(
        &page,
        &context,
        &TypeSelection::All,
        &PlanOptions { org_mode: OrgMode::Week, ..PlanOptions::new("/root") },
    );

    // --- Assert ---
    course_page.assert_async().await;
    assert_eq!(page.available_types(), vec!["VoD", "Lecture slides", "Assignments"]);

    assert_eq!(slides.len(), 1);
    assert_eq!(
        slides[0].destination,
        Path::new("/root/Spring 2025 - Semester 8/Computer Graphics (DMET502)/Lecture slides/Week 1 - Intro to X.pdf")
    );

    assert_eq!(everything.len(), 3);
    let video = everything.iter().find(|t| t.card.is_video).expect("video task");
    assert_eq!(video.extension, "mkv");
    assert_eq!(video.card.video_content_id.as_deref(), Some("4321_wxyz"));
    assert_eq!(
        video.destination,
        Path::new("/root/Spring 2025 - Semester 8/Computer Graphics (DMET502)/VoD/Week 2 - Lighting.mkv")
    );

    let sheet = by_week.iter().find(|t| t.extension == "docx").expect("sheet task");
    assert_eq!(
        sheet.destination,
        Path::new("/root/Spring 2025 - Semester 8/Computer Graphics (DMET502)/Week 1/Week 1 - Sheet 1.docx")
    );
}
