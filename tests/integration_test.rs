use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;

use ecourts_case_fetch::error::{BrowserError, BrowserResult, ErrorKind, OcrError};
use ecourts_case_fetch::utils::logging;
use ecourts_case_fetch::workflow::portal_form::{CAPTCHA_INPUT, DETAIL_SOURCES, SUBMIT_BUTTON};
use ecourts_case_fetch::{
    api, BrowserSession, CaptchaSolver, CaseQueryRequest, ChromeLauncher, Config, HandlerState,
    PageSnapshot, RequestHandler, SessionFactory, TesseractSolver,
};

const CASE_HISTORY: &str = include_str!("fixtures/case_history.html");
const EXAMPLE_CASE_TYPE: &str = "Cr.A(SJ) - CRIMINAL APPEAL (SINGLE JUDGE)(24)";

/// 模拟门户的行为开关
struct PortalScript {
    accept: &'static str,
    html: String,
    fail_navigation: bool,
    /// 提交后页面永远不给结论
    hang_after_submit: bool,
    /// 验证码通过后显示"查无此案"
    no_records: bool,
}

impl PortalScript {
    fn accepting(guess: &'static str) -> Self {
        Self {
            accept: guess,
            html: CASE_HISTORY.to_string(),
            fail_navigation: false,
            hang_after_submit: false,
            no_records: false,
        }
    }
}

/// 模拟门户：每个会话共享同一份脚本和计数器
struct StubPortal {
    script: PortalScript,
    opened: AtomicUsize,
    closed: AtomicUsize,
    submits: AtomicUsize,
}

impl StubPortal {
    fn new(script: PortalScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
        })
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct StubFactory(Arc<StubPortal>);

#[async_trait]
impl SessionFactory for StubFactory {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            portal: Arc::clone(&self.0),
            guess: Mutex::new(String::new()),
            pending: Mutex::new(None),
        }))
    }
}

struct StubSession {
    portal: Arc<StubPortal>,
    guess: Mutex<String>,
    pending: Mutex<Option<PageSnapshot>>,
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        if self.portal.script.fail_navigation {
            return Err(BrowserError::navigation_failed(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        Ok(())
    }

    async fn wait_for(&self, _selector: &str, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn select_option(&self, _selector: &str, text: &str) -> BrowserResult<Option<String>> {
        Ok(Some(text.to_string()))
    }

    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()> {
        if selector == CAPTCHA_INPUT {
            *self.guess.lock().unwrap() = value.to_string();
        }
        Ok(())
    }

    async fn click(&self, selector: &str, _text: Option<&str>) -> BrowserResult<bool> {
        if selector == SUBMIT_BUTTON {
            self.portal.submits.fetch_add(1, Ordering::SeqCst);
            let script = &self.portal.script;
            let snapshot = if *self.guess.lock().unwrap() != script.accept {
                PageSnapshot {
                    body_text: "Invalid Captcha".into(),
                    ..Default::default()
                }
            } else if script.no_records {
                PageSnapshot {
                    body_text: "Record Not Found".into(),
                    ..Default::default()
                }
            } else {
                PageSnapshot {
                    visible_markers: vec!["#showList".into()],
                    ..Default::default()
                }
            };
            *self.pending.lock().unwrap() = Some(snapshot);
        }
        Ok(true)
    }

    async fn screenshot(&self, _selector: &str) -> BrowserResult<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn snapshot(&self, _markers: &[&str]) -> BrowserResult<PageSnapshot> {
        if self.portal.script.hang_after_submit {
            std::future::pending::<()>().await;
        }
        Ok(self.pending.lock().unwrap().take().unwrap_or_default())
    }

    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>> {
        Ok((selector == DETAIL_SOURCES[0]).then(|| self.portal.script.html.clone()))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.portal.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 依次返回预设识别结果，用完后一直返回错误答案
struct CannedSolver(Mutex<Vec<&'static str>>);

impl CannedSolver {
    fn new(guesses: &[&'static str]) -> Arc<Self> {
        let mut guesses = guesses.to_vec();
        guesses.reverse();
        Arc::new(Self(Mutex::new(guesses)))
    }
}

#[async_trait]
impl CaptchaSolver for CannedSolver {
    async fn solve(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.lock().unwrap().pop().unwrap_or("ZZ99").to_string())
    }
}

fn test_config() -> Config {
    Config {
        retry_pause_ms: 0,
        form_settle_ms: 0,
        poll_interval_ms: 1,
        validation_timeout_secs: 1,
        ..Config::default()
    }
}

fn handler(portal: &Arc<StubPortal>, solver: Arc<dyn CaptchaSolver>) -> RequestHandler {
    RequestHandler::new(
        &test_config(),
        Arc::new(StubFactory(Arc::clone(portal))),
        solver,
    )
}

fn example_request() -> CaseQueryRequest {
    CaseQueryRequest::new(EXAMPLE_CASE_TYPE, "460", "2006")
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

#[tokio::test]
async fn test_example_case_accepted_on_second_attempt() {
    logging::init(true);
    let portal = StubPortal::new(PortalScript::accepting("AB12"));
    let handler = handler(&portal, CannedSolver::new(&["XX11", "AB12"]));

    let outcome = handler.run(example_request()).await;

    assert_eq!(
        outcome.trail,
        [
            HandlerState::Idle,
            HandlerState::Navigating,
            HandlerState::Retrying,
            HandlerState::Extracting,
            HandlerState::Rendering,
            HandlerState::Done,
        ]
    );
    let report = assert_ok!(outcome.result);
    assert_eq!(report.file_name, "Case_460_2006.pdf");
    assert!(report.bytes.starts_with(b"%PDF"));
    assert!(contains(&report.bytes, "(Case Details) Tj"));
    assert!(contains(&report.bytes, "(MPHC010012342006) Tj"));
    assert_eq!(portal.submits.load(Ordering::SeqCst), 2);
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_every_attempt_rejected_is_retry_exhausted() {
    let portal = StubPortal::new(PortalScript::accepting("AB12"));
    let handler = handler(&portal, CannedSolver::new(&[]));

    let outcome = handler.run(example_request()).await;

    assert_eq!(
        outcome.final_state(),
        Some(HandlerState::Failed(ErrorKind::RetryExhausted))
    );
    let err = assert_err!(outcome.result);
    assert_eq!(err.kind(), ErrorKind::RetryExhausted);
    assert_eq!(
        portal.submits.load(Ordering::SeqCst),
        test_config().max_captcha_attempts
    );
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_missing_cnr_is_malformed_page() {
    let mut script = PortalScript::accepting("AB12");
    script.html = CASE_HISTORY.replace("CNR Number", "Reference");
    let portal = StubPortal::new(script);
    let handler = handler(&portal, CannedSolver::new(&["AB12"]));

    let outcome = handler.run(example_request()).await;

    assert_eq!(
        outcome.final_state(),
        Some(HandlerState::Failed(ErrorKind::MalformedPage))
    );
    assert!(!outcome.trail.contains(&HandlerState::Rendering));
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_no_records_is_malformed_page() {
    let mut script = PortalScript::accepting("AB12");
    script.no_records = true;
    let portal = StubPortal::new(script);
    let handler = handler(&portal, CannedSolver::new(&["AB12"]));

    let err = assert_err!(handler.handle(example_request()).await);
    assert_eq!(err.kind(), ErrorKind::MalformedPage);
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_invalid_query_never_opens_a_browser() {
    let portal = StubPortal::new(PortalScript::accepting("AB12"));
    let handler = handler(&portal, CannedSolver::new(&["AB12"]));

    let outcome = handler
        .run(CaseQueryRequest::new(EXAMPLE_CASE_TYPE, "460", "1890"))
        .await;

    assert_eq!(
        outcome.trail,
        [
            HandlerState::Idle,
            HandlerState::Failed(ErrorKind::InvalidQuery)
        ]
    );
    assert_eq!(portal.opened(), 0);
}

#[tokio::test]
async fn test_navigation_failure_is_upstream_unavailable() {
    let mut script = PortalScript::accepting("AB12");
    script.fail_navigation = true;
    let portal = StubPortal::new(script);
    let handler = handler(&portal, CannedSolver::new(&["AB12"]));

    let err = assert_err!(handler.handle(example_request()).await);
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_cancelled_request_still_releases_browser() {
    let mut script = PortalScript::accepting("AB12");
    script.hang_after_submit = true;
    let portal = StubPortal::new(script);
    let handler = handler(&portal, CannedSolver::new(&["AB12"]));

    // 超时即丢弃请求 future，相当于客户端断开
    let result = tokio::time::timeout(
        Duration::from_millis(50),
        handler.handle(example_request()),
    )
    .await;
    assert!(result.is_err());

    // 关闭在后台任务里完成
    for _ in 0..50 {
        if portal.closed() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(portal.opened(), 1);
    assert_eq!(portal.closed(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_use_separate_sessions() {
    let portal = StubPortal::new(PortalScript::accepting("AB12"));
    let handler = handler(&portal, Arc::new(AlwaysSolver("AB12")));

    let (a, b) = tokio::join!(
        handler.handle(example_request()),
        handler.handle(CaseQueryRequest::new(EXAMPLE_CASE_TYPE, "461", "2007")),
    );
    assert_eq!(assert_ok!(a).file_name, "Case_460_2006.pdf");
    assert_eq!(assert_ok!(b).file_name, "Case_461_2007.pdf");
    assert_eq!(portal.opened(), 2);
    assert_eq!(portal.closed(), 2);
}

struct AlwaysSolver(&'static str);

#[async_trait]
impl CaptchaSolver for AlwaysSolver {
    async fn solve(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn test_http_endpoint_returns_pdf_attachment() {
    let portal = StubPortal::new(PortalScript::accepting("AB12"));
    let app = api::router(Arc::new(handler(&portal, CannedSolver::new(&["AB12"]))));

    let request = Request::builder()
        .method("POST")
        .uri("/scrape-case")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(
            r#"{{"case_type": "{}", "case_number": "460", "year": 2006}}"#,
            EXAMPLE_CASE_TYPE
        )))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("Case_460_2006.pdf"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"%PDF"));
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome + tesseract 并能访问门户：cargo test -- --ignored
async fn test_live_portal_example_case() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let handler = RequestHandler::new(
        &config,
        Arc::new(ChromeLauncher::new(&config)),
        Arc::new(TesseractSolver::new(&config)),
    );

    let outcome = handler.run(example_request()).await;
    println!("经过的阶段: {:?}", outcome.trail);

    let report = outcome.result.expect("抓取案件失败");
    assert!(!report.is_empty(), "应该生成非空的 PDF");
}
