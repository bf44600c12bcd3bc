//! Staging log observation strategies

mod common;

use cfpush::console::BufferConsole;
use cfpush::deploy::staging_logs::{observe, poll, LogStrategy};

use common::{staging_handle, Call, FakePlatform};

#[tokio::test]
async fn test_stream_mirrors_lines_without_polling() {
    let platform = FakePlatform::new().with_stream_lines(&["Staging...", "App started"]);
    let console = BufferConsole::new();

    let observation = observe(&platform, &console, "demo", &staging_handle(), LogStrategy::Stream).await;

    assert_eq!(observation.strategy, LogStrategy::Stream);
    assert!(observation.fallback_reason.is_none());
    assert_eq!(console.lines(), vec!["Staging...", "App started"]);
    assert!(platform.staging_offsets().is_empty());
}

#[tokio::test]
async fn test_stream_failure_switches_to_polling_from_zero() {
    let platform = FakePlatform::new()
        .failing_stream()
        .with_staging_chunks(&["abc\n", "defgh\nij\n"]);
    let console = BufferConsole::new();

    let observation = observe(&platform, &console, "demo", &staging_handle(), LogStrategy::Stream).await;

    assert_eq!(observation.strategy, LogStrategy::Poll);
    assert!(observation
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("websocket handshake refused"));
    assert_eq!(observation.polled_bytes, 13);
    assert_eq!(platform.staging_offsets(), vec![0, 4, 13]);
    assert_eq!(
        platform.count(|c| matches!(c, Call::StreamLogs { .. })),
        1
    );
    assert!(console.contains("WARNING: Exception occurred trying to get staging logs via websocket."));
    assert!(console.lines().ends_with(&["abc".to_string(), "defgh".to_string(), "ij".to_string()]));
}

#[tokio::test]
async fn test_poll_strategy_skips_stream() {
    let platform = FakePlatform::new().with_staging_chunks(&["only chunk"]);
    let console = BufferConsole::new();

    let observation = observe(&platform, &console, "demo", &staging_handle(), LogStrategy::Poll).await;

    assert_eq!(observation.strategy, LogStrategy::Poll);
    assert!(observation.fallback_reason.is_none());
    assert_eq!(platform.count(|c| matches!(c, Call::StreamLogs { .. })), 0);
    assert_eq!(console.lines(), vec!["only chunk"]);
}

#[tokio::test]
async fn test_poll_stops_on_empty_chunk() {
    let platform = FakePlatform::new().with_staging_chunks(&["first\n", "", "never read\n"]);
    let console = BufferConsole::new();

    let read = poll(&platform, &console, &staging_handle()).await;

    assert_eq!(read, 6);
    assert_eq!(platform.staging_offsets(), vec![0, 6]);
    assert!(!console.contains("never read"));
}
