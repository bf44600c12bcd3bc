//! HTTP client failures against a target nothing listens on

mod common;

use std::time::Duration;

use url::Url;

use cfpush::console::BufferConsole;
use cfpush::deploy::fsm::PushStage;
use cfpush::deploy::pusher::{self, Options, PushRequest, PushSource};
use cfpush::errors::PushError;
use cfpush::filesys::file::File;
use cfpush::http::{HttpClient, HttpOptions};
use cfpush::platform::PlatformClient;

use common::{counting_sleep, credentials, no_shutdown, write_file};

/// Port 1 on localhost refuses connections
const CLOSED_TARGET: &str = "https://127.0.0.1:1";

fn client() -> HttpClient {
    HttpClient::new(HttpOptions {
        timeout: Duration::from_secs(2),
        ..HttpOptions::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_login_to_closed_port_is_unreachable() {
    let target = Url::parse(CLOSED_TARGET).unwrap();

    let err = client()
        .login(&credentials(), &target, "acme", "dev")
        .await
        .unwrap_err();

    assert!(matches!(err, PushError::UnreachableTarget(_)), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_push_to_closed_port_reports_unknown_host() {
    let tmp = tempfile::tempdir().unwrap();
    write_file(tmp.path(), "manifest.yml", "applications:\n- name: demo\n");
    write_file(tmp.path(), "index.html", "<h1>demo</h1>");

    let request = PushRequest {
        target: CLOSED_TARGET.to_string(),
        organization: "acme".to_string(),
        space: "dev".to_string(),
        credentials: credentials(),
        source: PushSource::ManifestFile {
            file: File::new(tmp.path().join("manifest.yml")),
            app_name: None,
        },
        workspace: tmp.path().to_path_buf(),
        build_name: "nightly".to_string(),
        build_succeeded: true,
    };
    let console = BufferConsole::new();
    let (_, sleep_fn) = counting_sleep();

    let outcome = pusher::run(&request, &Options::default(), &client(), &console, sleep_fn, no_shutdown()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.stage, PushStage::Failed);
    assert!(outcome.history.contains(&PushStage::Login));
    assert!(!outcome.history.contains(&PushStage::CheckExists));
    assert!(console.contains("ERROR: Unknown host"));
    assert!(!console.contents().contains("s3cr3t-pa55"));
}
