// Prometheus metrics for the Verdict API
use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;
use verdict_common::types::RunResult;

struct Metrics {
    registry: Registry,
    evaluations_total: IntCounterVec,
    evaluation_duration_seconds: HistogramVec,
}

impl Metrics {
    fn register() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let evaluations_total = IntCounterVec::new(
            Opts::new("verdict_evaluations_total", "Evaluations by language and outcome"),
            &["language", "outcome"],
        )?;
        let evaluation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "verdict_evaluation_duration_seconds",
                "Wall-clock time of one evaluation call",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["language"],
        )?;

        registry.register(Box::new(evaluations_total.clone()))?;
        registry.register(Box::new(evaluation_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            evaluations_total,
            evaluation_duration_seconds,
        })
    }
}

lazy_static! {
    static ref METRICS: Option<Metrics> = match Metrics::register() {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    };
}

/// Outcome label for a finished evaluation
pub fn outcome_label(result: &RunResult) -> &'static str {
    if result.is_timeout() {
        "timeout"
    } else if result.is_harness_failure() {
        "error"
    } else if result.all_passed() {
        "passed"
    } else {
        "failed"
    }
}

pub fn record_evaluation(language: &str, result: &RunResult, seconds: f64) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics
            .evaluations_total
            .with_label_values(&[language, outcome_label(result)])
            .inc();
        metrics
            .evaluation_duration_seconds
            .with_label_values(&[language])
            .observe(seconds);
    }
}

/// Prometheus text exposition of every registered metric
pub fn render() -> anyhow::Result<String> {
    let Some(metrics) = METRICS.as_ref() else {
        return Ok(String::new());
    };

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_common::types::{CaseResult, TestCase};

    fn case(pass: bool) -> CaseResult {
        CaseResult {
            input: "1".to_string(),
            expected: "1".to_string(),
            actual: "1".to_string(),
            pass,
            description: "Test 1".to_string(),
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&RunResult::from_cases(vec![case(true)])), "passed");
        assert_eq!(outcome_label(&RunResult::from_cases(vec![case(true), case(false)])), "failed");
        assert_eq!(outcome_label(&RunResult::harness_failure(1, "SyntaxError")), "error");
        assert_eq!(outcome_label(&RunResult::timed_out(&[TestCase::new("1", "1")], 10)), "timeout");
        assert_eq!(outcome_label(&RunResult::timed_out(&[], 10)), "timeout");
    }

    #[test]
    fn test_render_includes_recorded_series() {
        record_evaluation("javascript", &RunResult::from_cases(vec![case(true)]), 0.02);

        let text = render().unwrap();
        assert!(text.contains("verdict_evaluations_total"));
        assert!(text.contains("language=\"javascript\""));
        assert!(text.contains("verdict_evaluation_duration_seconds_bucket"));
    }
}
