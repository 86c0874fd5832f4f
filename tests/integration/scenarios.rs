//! End-to-end scenarios from parameters to aggregate result

use std::future::pending;
use std::time::Duration;

use check_multiple::aggregate::HEALTHY_MESSAGE;
use check_multiple::error::Error;
use check_multiple::report::Report;
use check_multiple::status::Severity;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_all_checks_ok() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_queue",
        &[
            ("orders", "echo 'OK: queue depth 1'; exit 0"),
            ("events", "echo 'OK: queue depth 2'; exit 0"),
            ("mail", "echo 'OK: queue depth 3'; exit 0"),
        ],
    );
    let config = config_with_timeout(Duration::from_secs(5));

    let aggregate = check_multiple::run(&base, &params(&["orders", "events", "mail"]), &config, pending())
        .await
        .unwrap();

    assert_eq!(aggregate.severity, Severity::Ok);
    assert_eq!(aggregate.message, HEALTHY_MESSAGE);
    assert_eq!(aggregate.counts.total(), 3);
    assert_eq!(Report::plugin(&aggregate).severity.exit_code(), 0);
}

#[tokio::test]
async fn test_single_warning_is_tagged_with_parameter() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_queue",
        &[
            ("orders", "echo 'WARNING: queue depth 60'; exit 1"),
            ("mail", "echo 'OK: queue depth 3'; exit 0"),
        ],
    );
    let config = config_with_timeout(Duration::from_secs(5));

    let aggregate = check_multiple::run(&base, &params(&["orders", "mail"]), &config, pending())
        .await
        .unwrap();

    assert_eq!(aggregate.severity, Severity::Warning);
    assert_eq!(aggregate.message, "orders: WARNING: queue depth 60");
    assert_eq!(Report::plugin(&aggregate).severity.exit_code(), 1);
}

#[tokio::test]
async fn test_critical_and_timeout() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_disk",
        &[
            ("data", "echo 'CRITICAL: disk full'; exit 2"),
            ("backup", "exec sleep 30"),
        ],
    );
    let config = config_with_timeout(Duration::from_secs(1));

    let aggregate = check_multiple::run(&base, &params(&["data", "backup"]), &config, pending())
        .await
        .unwrap();

    assert_eq!(aggregate.severity, Severity::Critical);
    assert!(aggregate.message.contains("data: CRITICAL: disk full"));
    assert!(aggregate.message.contains("backup: UNKNOWN: check timed out"));
    assert_eq!(aggregate.counts.faults, 1);
    assert_eq!(Report::plugin(&aggregate).severity.exit_code(), 2);
}

#[tokio::test]
async fn test_no_parameters() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher("check_queue", &[]);
    let config = config_with_timeout(Duration::from_secs(5));

    let error = check_multiple::run(&base, &[], &config, pending()).await.unwrap_err();
    assert!(matches!(error, Error::NoParameters));

    let report = Report::error(&error);
    assert_eq!(report.severity.exit_code(), 3);
    assert!(report.output.contains("no checks executed"));
}

#[tokio::test]
async fn test_undefined_exit_code_is_reported() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_queue",
        &[
            ("orders", "echo 'OK: fine'; exit 77"),
            ("mail", "echo 'OK: queue depth 3'; exit 0"),
        ],
    );
    let config = config_with_timeout(Duration::from_secs(5));

    let aggregate = check_multiple::run(&base, &params(&["orders", "mail"]), &config, pending())
        .await
        .unwrap();

    assert_eq!(aggregate.severity, Severity::Unknown);
    assert_eq!(aggregate.message, "orders: UNKNOWN: check exited with unexpected code 77");
}

#[tokio::test]
async fn test_performance_data_is_preserved() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_lbpool",
        &[("pool_web", "echo 'CRITICAL: 1 of 4 nodes up | up=1;2;1 total=4'; exit 2")],
    );
    let config = config_with_timeout(Duration::from_secs(5));

    let aggregate = check_multiple::run(&base, &params(&["pool_web"]), &config, pending())
        .await
        .unwrap();

    assert_eq!(
        aggregate.message,
        "pool_web: CRITICAL: 1 of 4 nodes up | up=1;2;1 total=4"
    );
}
