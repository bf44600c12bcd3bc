//! Bounded instance health polling

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use cfpush::deploy::health::{poll, HealthOutcome, Options};
use cfpush::errors::PushError;
use cfpush::platform::{CloudApplication, InstanceState, InstancesInfo};

use common::{counting_sleep, no_shutdown, report, running, FakePlatform};

fn app() -> CloudApplication {
    CloudApplication {
        guid: "demo-guid".to_string(),
        name: "demo".to_string(),
        memory: 256,
        instances: 2,
        state: Some("STARTED".to_string()),
    }
}

#[tokio::test]
async fn test_converges_as_soon_as_all_run() {
    let platform = FakePlatform::new().with_reports(vec![
        None,
        Some(report(&[InstanceState::Running, InstanceState::Starting])),
        running(2),
    ]);
    let (sleeps, sleep_fn) = counting_sleep();
    let mut shutdown = no_shutdown();

    let outcome = poll(&platform, &app(), 10, &Options::default(), &sleep_fn, &mut shutdown)
        .await
        .unwrap();

    match outcome {
        HealthOutcome::Converged { tally, attempts } => {
            assert_eq!(attempts, 3);
            assert_eq!(tally.running, 2);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(sleeps.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_times_out_after_exact_attempts() {
    let platform = FakePlatform::new().with_reports(vec![Some(report(&[
        InstanceState::Running,
        InstanceState::Starting,
        InstanceState::Flapping,
    ]))]);
    let (sleeps, sleep_fn) = counting_sleep();
    let mut shutdown = no_shutdown();

    let outcome = poll(&platform, &app(), 5, &Options::default(), &sleep_fn, &mut shutdown)
        .await
        .unwrap();

    match outcome {
        HealthOutcome::TimedOut { last, attempts } => {
            assert_eq!(attempts, 5);
            let last = last.unwrap();
            assert_eq!(last.to_string(), "1 running, 1 starting, 1 flapping");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(sleeps.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_empty_report_converges() {
    let platform = FakePlatform::new().with_reports(vec![None, Some(InstancesInfo::default())]);
    let (sleeps, sleep_fn) = counting_sleep();
    let mut shutdown = no_shutdown();

    let outcome = poll(&platform, &app(), 3, &Options::default(), &sleep_fn, &mut shutdown)
        .await
        .unwrap();

    assert!(matches!(outcome, HealthOutcome::Converged { attempts: 2, .. }));
    assert_eq!(outcome.tally().total(), 0);
    assert_eq!(sleeps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_absent_reports_time_out() {
    let platform = FakePlatform::new().with_reports(vec![None]);
    let (sleeps, sleep_fn) = counting_sleep();
    let mut shutdown = no_shutdown();

    let outcome = poll(&platform, &app(), 3, &Options::default(), &sleep_fn, &mut shutdown)
        .await
        .unwrap();

    assert_eq!(outcome, HealthOutcome::TimedOut { last: None, attempts: 3 });
    assert_eq!(sleeps.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_shutdown_cancels_between_attempts() {
    let platform = FakePlatform::new().with_reports(vec![None]);
    let mut shutdown: std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> =
        Box::pin(async {});
    let options = Options {
        interval: Duration::from_secs(3600),
    };

    let result = poll(&platform, &app(), 60, &options, &tokio::time::sleep, &mut shutdown).await;

    assert!(matches!(result, Err(PushError::Cancelled(_))));
}
