use std::time::Duration;

use super::*;

#[tokio::test]
async fn test_critical_stage_passes_value_and_records_timing() {
    let mut timings = StageTimings::new();
    let value = critical_stage(
        Stage::Navigate,
        Duration::from_secs(5),
        false,
        &mut timings,
        async { Ok(7u32) },
    )
    .await
    .unwrap();
    assert_eq!(value, 7);
    assert!(timings.get(Stage::Navigate).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_critical_timeout_names_stage_and_budget() {
    let mut timings = StageTimings::new();
    let result: Result<(), RenderError> = critical_stage(
        Stage::Screenshot,
        Duration::from_millis(50),
        false,
        &mut timings,
        async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        },
    )
    .await;

    match result {
        Err(RenderError::StageTimeout { stage, budget_ms }) => {
            assert_eq!(stage, Stage::Screenshot);
            assert_eq!(budget_ms, 50);
        }
        other => panic!("expected StageTimeout, got {:?}", other),
    }
    assert!(timings.get(Stage::Screenshot).is_some());
}

#[tokio::test]
async fn test_critical_error_passes_through_unchanged() {
    let mut timings = StageTimings::new();
    let result: Result<(), RenderError> = critical_stage(
        Stage::Audit,
        Duration::from_secs(5),
        false,
        &mut timings,
        async { Err(RenderError::Engine("evaluate blew up".to_string())) },
    )
    .await;
    match result {
        Err(RenderError::Engine(msg)) => assert!(msg.contains("evaluate blew up")),
        other => panic!("expected Engine error, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_soft_timeout_degrades_to_none() {
    let mut timings = StageTimings::new();
    let result = soft_stage(
        Stage::OverlayScan,
        Duration::from_millis(20),
        false,
        &mut timings,
        async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1u32)
        },
    )
    .await;
    assert_eq!(result, None);
    assert!(timings.get(Stage::OverlayScan).is_some());
}

#[tokio::test]
async fn test_soft_error_degrades_to_none() {
    let mut timings = StageTimings::new();
    let result = soft_stage(
        Stage::BotCheck,
        Duration::from_secs(5),
        false,
        &mut timings,
        async { Err::<u32, _>(RenderError::Engine("probe failed".to_string())) },
    )
    .await;
    assert_eq!(result, None);
}

#[tokio::test(start_paused = true)]
async fn test_relaxed_mode_outlives_the_budget() {
    let mut timings = StageTimings::new();
    let value = critical_stage(
        Stage::Navigate,
        Duration::from_millis(1),
        true,
        &mut timings,
        async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(42u32)
        },
    )
    .await
    .unwrap();
    assert_eq!(value, 42);

    let soft = soft_stage(
        Stage::Settle,
        Duration::from_millis(1),
        true,
        &mut timings,
        async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(9u32)
        },
    )
    .await;
    assert_eq!(soft, Some(9));
}
