//! Timing behaviour of the fan-out

use std::sync::Arc;
use std::time::{Duration, Instant};

use check_multiple::aggregate::aggregate;
use check_multiple::invoker::ProcessRunner;
use check_multiple::scheduler::FanOut;
use check_multiple::status::Severity;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_hung_check_does_not_delay_others() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher(
        "check_queue",
        &[
            ("hang", "exec sleep 60"),
            ("q1", "echo 'OK: q1'"),
            ("q2", "echo 'OK: q2'"),
            ("q3", "echo 'OK: q3'"),
            ("q4", "echo 'OK: q4'"),
        ],
    );
    let timeout = Duration::from_secs(1);
    let fan_out = FanOut::new(Arc::new(ProcessRunner::default()), timeout);

    let start = Instant::now();
    let results = fan_out
        .run(&base, &params(&["q1", "hang", "q2", "q3", "q4"]))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < timeout + Duration::from_secs(2), "took {elapsed:?}");
    assert_eq!(results.len(), 5);

    let faults: Vec<_> = results.iter().filter(|r| r.is_fault()).collect();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].parameter, "hang");

    let healthy = results.iter().filter(|r| r.severity == Severity::Ok).count();
    assert_eq!(healthy, 4);
}

#[tokio::test]
async fn test_run_time_does_not_grow_with_parameter_count() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher("check_queue", &[("*", "sleep 1; echo \"OK: $last\"")]);
    let fan_out = FanOut::new(Arc::new(ProcessRunner::default()), Duration::from_secs(10));
    let parameters: Vec<String> = (0..16).map(|i| format!("queue{i}")).collect();

    let start = Instant::now();
    let results = fan_out.run(&base, &parameters).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    assert_eq!(results.len(), 16);
    for (result, parameter) in results.iter().zip(&parameters) {
        assert_eq!(&result.parameter, parameter);
        assert_eq!(result.message, format!("OK: {parameter}"));
    }
}

#[tokio::test]
async fn test_duplicate_parameters_run_independently() {
    let plugins = Plugins::new();
    let base = plugins.dispatcher("check_queue", &[("orders", "echo 'WARNING: slow'; exit 1")]);
    let fan_out = FanOut::new(Arc::new(ProcessRunner::default()), Duration::from_secs(5));

    let results = fan_out
        .run(&base, &params(&["orders", "orders", "orders"]))
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let aggregate = aggregate(&results);
    assert_eq!(aggregate.counts.warning, 3);
    assert_eq!(aggregate.message.lines().count(), 3);
}
