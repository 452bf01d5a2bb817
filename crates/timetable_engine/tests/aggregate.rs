use std::sync::{Arc, Once};
use std::time::Duration;

use timetable_engine::{
    AesEcbHexCipher, CaptchaError, CaptchaSolver, PortalConfig, ScheduleFetcher,
    SemesterAggregator, Session, SessionAuthenticator,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIMING_PATH: &str = "/xsgrkbcx!xskbList.action";
const DATA_PATH: &str = "/xsgrkbcx!getKbRq.action";

const MATH_WEEK: &str = r#"[[{"xq":"1","jcdm":"0102","kcmc":"Math","teaxms":"Li","jxcdmc":"A101"}],[{"xqmc":"1","rq":"2025-03-03"}]]"#;
const TWO_COURSE_WEEK: &str = r#"[[{"xq":"1","jcdm":"0102","kcmc":"Math","teaxms":"Li","jxcdmc":"A101"},{"xq":"2","jcdm":"0304","kcmc":"English","teaxms":"Zhao","jxcdmc":"C303"}],[{"xqmc":"1","rq":"2025-03-03"},{"xqmc":"2","rq":"2025-03-04"}]]"#;

struct FixedSolver;

impl CaptchaSolver for FixedSolver {
    fn recognize(&self, _image: &[u8]) -> Result<String, CaptchaError> {
        Ok("abcd".to_string())
    }
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(timetable_logging::initialize_for_tests);
}

fn test_config(base_url: &str) -> PortalConfig {
    let mut config = PortalConfig::new(base_url);
    config.request_timeout = Duration::from_secs(5);
    config.captcha_retry_delay = Duration::from_millis(1);
    config.captcha_backoff = Duration::from_millis(1);
    config.transient_backoff = Duration::from_millis(1);
    config.fetch_retry_delays = vec![Duration::from_millis(1)];
    config.week_delay = Duration::from_millis(1);
    config
}

async fn authenticated_session(server: &MockServer) -> Session {
    init_logging();
    Mock::given(method("GET"))
        .and(path("/yzm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code":0,"message":"ok"}"#))
        .mount(server)
        .await;
    let auth = SessionAuthenticator::new(
        test_config(&server.uri()),
        Arc::new(FixedSolver),
        &AesEcbHexCipher,
    )
    .expect("client builds");
    auth.authenticate("user", "pass").await.expect("login succeeds")
}

fn aggregator(server: &MockServer, session: Session) -> SemesterAggregator {
    let config = test_config(&server.uri());
    SemesterAggregator::new(ScheduleFetcher::new(session, config.clone()), config)
}

/// A 10-week term where weeks 3 and 7 never answer: the failures are
/// recorded, every other week is merged, and 20% < 50% keeps the
/// completeness flag off.
#[tokio::test]
async fn failed_weeks_are_contained_and_reported() {
    let server = MockServer::start().await;
    let session = authenticated_session(&server).await;

    Mock::given(method("GET"))
        .and(path(PRIMING_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    for bad_week in ["3", "7"] {
        Mock::given(method("GET"))
            .and(path(DATA_PATH))
            .and(query_param("zc", bad_week))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
    }
    // Week 1 carries an extra course; week 2 has no classes at all.
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("zc", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TWO_COURSE_WEEK))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("zc", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(MATH_WEEK))
        .mount(&server)
        .await;

    let report = aggregator(&server, session).run("202501", 10).await;

    assert_eq!(report.failed_weeks, vec![3, 7]);
    assert!(!report.degraded);
    // Math is re-reported by every successful week and collapses to one
    // event; English only appears in week 1.
    let names: Vec<&str> = report.events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Math", "English"]);
}

#[tokio::test]
async fn losing_most_of_the_term_sets_the_degraded_flag() {
    let server = MockServer::start().await;
    let session = authenticated_session(&server).await;

    Mock::given(method("GET"))
        .and(path(PRIMING_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    for good_week in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path(DATA_PATH))
            .and(query_param("zc", good_week))
            .respond_with(ResponseTemplate::new(200).set_body_string(MATH_WEEK))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = aggregator(&server, session).run("202501", 6).await;

    assert_eq!(report.failed_weeks, vec![3, 4, 5, 6]);
    assert!(report.degraded);
    // The weeks merged before the failures survive.
    assert_eq!(report.events.len(), 1);
}

#[tokio::test]
async fn html_wrapped_weeks_merge_like_raw_json() {
    let server = MockServer::start().await;
    let session = authenticated_session(&server).await;

    Mock::given(method("GET"))
        .and(path(PRIMING_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("zc", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MATH_WEEK))
        .mount(&server)
        .await;
    let wrapped = format!("<html><body><p>{MATH_WEEK}</p></body></html>");
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("zc", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(wrapped))
        .mount(&server)
        .await;

    let report = aggregator(&server, session).run("202501", 2).await;

    assert!(report.failed_weeks.is_empty());
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].name, "Math");
}
