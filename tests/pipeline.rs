//! End-to-end runs through the library API against an in-memory session

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use tempfile::TempDir;
use url::Url;

use jnlp_fetcher::app::{
    DescriptorParser, DownloadOutcome, FetchEvent, FetchResponse, HttpSession, ParserMode,
    Pipeline, RunEvent,
};
use jnlp_fetcher::errors::{AppError, DescriptorError, ParseError, TransportError, TransportResult};

const DESCRIPTOR_URL: &str = "https://example.com/app/launch.jnlp";

/// Serves registered bodies; everything else answers 404
#[derive(Default)]
struct StaticSession {
    routes: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticSession {
    fn route(mut self, url: &str, body: impl AsRef<[u8]>) -> Self {
        self.routes.insert(url.to_string(), body.as_ref().to_vec());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSession for StaticSession {
    async fn get(&self, url: &Url) -> TransportResult<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(match self.routes.get(url.as_str()) {
            Some(body) => FetchResponse::ok(body.clone()),
            None => FetchResponse::with_status(StatusCode::NOT_FOUND),
        })
    }
}

fn descriptor_url() -> Url {
    Url::parse(DESCRIPTOR_URL).unwrap()
}

fn tolerant() -> DescriptorParser {
    DescriptorParser::new(ParserMode::Tolerant)
}

#[tokio::test]
async fn test_full_run_downloads_every_resource() {
    let output = TempDir::new().unwrap();
    let descriptor = r#"<?xml version="1.0" encoding="utf-8"?>
<jnlp spec="1.0+" codebase="https://example.com/java" href="launch.jnlp">
  <information><title>Sample</title></information>
  <resources>
    <j2se version="1.8+"/>
    <jar href="lib/app.jar" main="true"/>
    <jar href="lib/util.jar" version="1.2"/>
  </resources>
  <resources os="Windows">
    <nativelib href="native/win.jar"/>
  </resources>
</jnlp>"#;
    let session = StaticSession::default()
        .route(DESCRIPTOR_URL, descriptor)
        .route("https://example.com/java/lib/app.jar", b"APP")
        .route("https://example.com/java/lib/util__V1.2.jar", b"UTIL")
        .route("https://example.com/java/native/win.jar", b"WIN");

    let pipeline = Pipeline::new(&session, tolerant(), output.path()).with_dir_name("run");

    let mut events = Vec::new();
    let report = pipeline
        .run(&descriptor_url(), &mut |event| events.push(event))
        .await
        .unwrap();

    assert_eq!(report.base_url, "https://example.com/java/");
    assert_eq!(report.saved(), 3);
    assert_eq!(report.total(), 3);
    assert_eq!(report.label, "run");

    let dir = output.path().join("run");
    assert_eq!(std::fs::read(dir.join("app.jar")).unwrap(), b"APP");
    assert_eq!(std::fs::read(dir.join("util__V1.2.jar")).unwrap(), b"UTIL");
    assert_eq!(std::fs::read(dir.join("win.jar")).unwrap(), b"WIN");
    assert!(!dir.join("util.jar").exists());

    assert_eq!(
        session.requests(),
        vec![
            DESCRIPTOR_URL,
            "https://example.com/java/lib/app.jar",
            "https://example.com/java/lib/util.jar",
            "https://example.com/java/lib/util.jar?version-id=1.2",
            "https://example.com/java/lib/util__V1.2.jar",
            "https://example.com/java/native/win.jar",
        ]
    );

    let attempts = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Fetch(FetchEvent::Attempting { .. })))
        .count();
    assert_eq!(attempts, 5);
    assert!(matches!(events[0], RunEvent::Planned { resources: 3 }));
}

#[tokio::test]
async fn test_malformed_descriptor_is_recovered() {
    let output = TempDir::new().unwrap();
    // unescaped ampersand, mismatched close tag, no closing root
    let descriptor = r#"<jnlp codebase="https://example.com/java?a=1&b=2">
  <information><title>R&D</titel></information>
  <resources><jar href="lib/app.jar"/>"#;
    let session = StaticSession::default()
        .route(DESCRIPTOR_URL, descriptor)
        .route("https://example.com/java?a=1&b=2/lib/app.jar", b"APP");

    let pipeline = Pipeline::new(&session, tolerant(), output.path()).with_dir_name("run");
    let report = pipeline
        .run(&descriptor_url(), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(report.base_url, "https://example.com/java?a=1&b=2/");
    assert_eq!(report.total(), 1);
    assert_eq!(report.saved(), 1);
    assert_eq!(
        std::fs::read(output.path().join("run").join("app.jar")).unwrap(),
        b"APP"
    );
}

#[tokio::test]
async fn test_latin1_descriptor_in_strict_mode() {
    let output = TempDir::new().unwrap();
    let descriptor = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
<jnlp codebase=\"https://example.com/java\"><information><title>Caf\xe9</title></information>\
<resources><jar href=\"lib/app.jar\"/></resources></jnlp>";
    let session = StaticSession::default()
        .route(DESCRIPTOR_URL, descriptor)
        .route("https://example.com/java/lib/app.jar", b"APP");

    let pipeline = Pipeline::new(&session, DescriptorParser::new(ParserMode::Strict), output.path())
        .with_dir_name("run");
    let report = pipeline
        .run(&descriptor_url(), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(report.saved(), 1);
    assert!(output.path().join("run").join("app.jar").exists());
}

#[tokio::test]
async fn test_strict_mode_rejects_malformed_descriptor() {
    let output = TempDir::new().unwrap();
    let session = StaticSession::default().route(
        DESCRIPTOR_URL,
        r#"<jnlp codebase="https://example.com/java"><resources><jar href="lib/app.jar"></resources></jnlp>"#,
    );

    let pipeline = Pipeline::new(&session, DescriptorParser::new(ParserMode::Strict), output.path());
    let err = pipeline
        .run(&descriptor_url(), &mut |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Parse(ParseError::Strict(_))));
    assert!(err.is_clean_exit());
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_codebase_writes_nothing() {
    let output = TempDir::new().unwrap();
    let session = StaticSession::default()
        .route(DESCRIPTOR_URL, r#"<jnlp><resources><jar href="lib/app.jar"/></resources></jnlp>"#);

    let pipeline = Pipeline::new(&session, tolerant(), output.path());
    let err = pipeline
        .run(&descriptor_url(), &mut |_| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Descriptor(DescriptorError::MissingCodebase { .. })
    ));
    assert!(err.is_clean_exit());
    assert_eq!(session.requests(), vec![DESCRIPTOR_URL]);
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_inaccessible_descriptor() {
    let output = TempDir::new().unwrap();
    let session = StaticSession::default();

    let pipeline = Pipeline::new(&session, tolerant(), output.path());
    let err = pipeline
        .run(&descriptor_url(), &mut |_| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Transport(TransportError::Status {
            status: StatusCode::NOT_FOUND,
            ..
        })
    ));
    assert_eq!(err.to_string(), "404 Not Found");
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_directory_collision_falls_back_to_output_root() {
    let output = TempDir::new().unwrap();
    std::fs::create_dir(output.path().join("taken")).unwrap();
    let session = StaticSession::default()
        .route(
            DESCRIPTOR_URL,
            r#"<jnlp codebase="https://example.com/java"><jar href="x/y.jar"/></jnlp>"#,
        )
        .route("https://example.com/java/x/y.jar", b"Y");

    let pipeline = Pipeline::new(&session, tolerant(), output.path()).with_dir_name("taken");
    let mut fell_back = false;
    let report = pipeline
        .run(&descriptor_url(), &mut |event| {
            if let RunEvent::Destination { fallback, .. } = event {
                fell_back = fallback.is_some();
            }
        })
        .await
        .unwrap();

    assert!(fell_back);
    assert_eq!(report.label, ".");
    assert_eq!(std::fs::read(output.path().join("y.jar")).unwrap(), b"Y");
    assert!(!output.path().join("taken").join("y.jar").exists());
}

#[tokio::test]
async fn test_unavailable_resources_do_not_fail_the_run() {
    let output = TempDir::new().unwrap();
    let session = StaticSession::default().route(
        DESCRIPTOR_URL,
        r#"<jnlp codebase="https://example.com/java">
  <jar href="lib/gone.jar" version="2"/>
  <jar href="noslash.jar"/>
</jnlp>"#,
    );

    let pipeline = Pipeline::new(&session, tolerant(), output.path()).with_dir_name("run");
    let mut skipped = 0;
    let report = pipeline
        .run(&descriptor_url(), &mut |event| {
            if let RunEvent::Rejected(_) = event {
                skipped += 1;
            }
        })
        .await
        .unwrap();

    assert_eq!(skipped, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.saved(), 0);
    match &report.outcomes[0] {
        DownloadOutcome::NotFound { attempted } => assert_eq!(attempted.len(), 3),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        std::fs::read_dir(output.path().join("run")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_random_directory_name() {
    let output = TempDir::new().unwrap();
    let session = StaticSession::default()
        .route(
            DESCRIPTOR_URL,
            r#"<jnlp codebase="https://example.com/java"><jar href="x/y.jar"/></jnlp>"#,
        )
        .route("https://example.com/java/x/y.jar", b"Y");

    let pipeline = Pipeline::new(&session, tolerant(), output.path());
    let report = pipeline.run(&descriptor_url(), &mut |_| {}).await.unwrap();

    assert_eq!(report.label.len(), 10);
    assert!(report
        .label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    assert!(report.destination.join("y.jar").exists());
}
