//! Per-stage watchdogs.
//!
//! Every pipeline stage runs under its own `tokio::time::timeout` and
//! records its wall-clock duration. Critical stages abort the render on
//! timeout or error; soft stages degrade to a skipped result so one slow
//! heuristic never costs the whole request. `relaxed` disables the
//! timeouts for trusted batch callers.

use std::time::{Duration, Instant};

use foldlens_protocols::{RenderError, Stage, StageTimings};
use tracing::warn;

/// Run a stage whose failure or timeout fails the render.
///
/// Timeout maps to [`RenderError::StageTimeout`] with this stage's budget;
/// errors pass through unchanged.
pub async fn critical_stage<T, F>(
    stage: Stage,
    budget: Duration,
    relaxed: bool,
    timings: &mut StageTimings,
    fut: F,
) -> Result<T, RenderError>
where
    F: Future<Output = Result<T, RenderError>>,
{
    debug_assert!(stage.is_critical());
    let started = Instant::now();
    let outcome = if relaxed {
        Ok(fut.await)
    } else {
        tokio::time::timeout(budget, fut).await
    };
    timings.record(stage, started.elapsed());

    match outcome {
        Ok(result) => result,
        Err(_) => Err(RenderError::StageTimeout {
            stage,
            budget_ms: budget.as_millis() as u64,
        }),
    }
}

/// Run a stage the render can live without.
///
/// Timeout and error both degrade to `None`; the caller substitutes its
/// zero value and continues.
pub async fn soft_stage<T, F>(
    stage: Stage,
    budget: Duration,
    relaxed: bool,
    timings: &mut StageTimings,
    fut: F,
) -> Option<T>
where
    F: Future<Output = Result<T, RenderError>>,
{
    debug_assert!(!stage.is_critical());
    let started = Instant::now();
    let outcome = if relaxed {
        Ok(fut.await)
    } else {
        tokio::time::timeout(budget, fut).await
    };
    timings.record(stage, started.elapsed());

    match outcome {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!(stage = %stage, error = %err, "Stage failed, continuing degraded");
            None
        }
        Err(_) => {
            warn!(stage = %stage, budget_ms = budget.as_millis() as u64, "Stage timed out, continuing degraded");
            None
        }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
