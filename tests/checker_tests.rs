//! HTTP checker tests against a local mock server

use sitepulse::checker::{CheckError, CheckFlags, HttpChecker, PageChecker};
use sitepulse::config::CheckerConfig;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checker_config(request_timeout_secs: u64) -> CheckerConfig {
    CheckerConfig {
        depth: 1,
        follow_pagination: true,
        save_artifacts: false,
        page_cap: 10,
        request_timeout_secs,
        user_agent: "sitepulse-test".to_string(),
    }
}

fn flags(save_artifacts: bool) -> CheckFlags {
    CheckFlags {
        save_artifacts,
        follow_pagination: true,
    }
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

#[tokio::test]
async fn test_checks_root_and_linked_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><head><title>Home</title></head><body>
               <a href="/about">About</a>
               <a href="/contact">Contact</a>
               </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_response("<html><body>about</body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html_response("<html><body>contact</body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let checker = HttpChecker::new(&checker_config(5), dir.path()).unwrap();

    let report = checker
        .check(&server.uri(), 1, flags(false))
        .await
        .unwrap();

    assert_eq!(report.pages_checked, 3);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.title, Some("Home".to_string()));
    assert_eq!(report.links_found, 2);
}

#[tokio::test]
async fn test_broken_link_counts_as_failed_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body><a href="/missing">Missing</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let checker = HttpChecker::new(&checker_config(5), dir.path()).unwrap();

    let report = checker
        .check(&server.uri(), 1, flags(false))
        .await
        .unwrap();

    assert_eq!(report.pages_checked, 2);
    assert_eq!(report.pages_failed, 1);
}

#[tokio::test]
async fn test_root_error_status_fails_the_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let checker = HttpChecker::new(&checker_config(5), dir.path()).unwrap();

    let err = checker
        .check(&server.uri(), 1, flags(false))
        .await
        .unwrap_err();

    match err {
        CheckError::Network(msg) => assert!(msg.contains("404"), "got: {}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_root_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html_response("<html></html>").set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let checker = HttpChecker::new(&checker_config(1), dir.path()).unwrap();

    let err = checker
        .check(&server.uri(), 0, flags(false))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckError::Timeout));
}

#[tokio::test]
async fn test_artifacts_saved_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<html><body>hello</body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let checker = HttpChecker::new(&checker_config(5), dir.path()).unwrap();

    checker.check(&server.uri(), 0, flags(true)).await.unwrap();

    // One host directory containing one saved page
    let host_dirs: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(host_dirs.len(), 1);
    let host_dir = host_dirs[0].as_ref().unwrap().path();
    let pages: Vec<_> = std::fs::read_dir(&host_dir).unwrap().collect();
    assert_eq!(pages.len(), 1);
}
