// =============================================================================
// batch.rs: THE BATCH DRIVER
// =============================================================================
//
// Runs the decision engine over a whole dataset.
//
// Every sample is independent and the engine is read-only, so rows fan out
// over a rayon pool sized by the `workers` setting. `collect` on an indexed
// parallel iterator puts results back in input order, which means
// outcome[i] always belongs to sample[i], however many threads ran.
//
// One bad row never sinks the batch. Extractor errors and panics are caught
// at row granularity and recorded as a `RowError` in that row's slot.
// =============================================================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::dataset;
use crate::engine::DecisionEngine;
use crate::error::{DatasetError, RowError};
use crate::extractor::KeyWordExtractor;
use crate::matcher::Matcher;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::{DiagnosedSample, Diagnosis, Sample};

pub type RowOutcome = Result<Diagnosis, RowError>;

/// What a batch run produced.
#[derive(Debug)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per input sample, same order.
    pub outcomes: Vec<RowOutcome>,
    pub metrics: MetricsSnapshot,
}

/// Serializable summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub threshold: f64,
    pub workers: usize,
    pub metrics: MetricsSnapshot,
}

impl BatchOutcome {
    pub fn report(&self, threshold: f64, workers: usize) -> RunReport {
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            threshold,
            workers,
            metrics: self.metrics.clone(),
        }
    }
}

/// Diagnose every sample, preserving input order.
pub fn run_batch<E, M>(
    engine: &DecisionEngine<E, M>,
    samples: &[Sample],
    workers: usize,
) -> Result<BatchOutcome, rayon::ThreadPoolBuildError>
where
    E: KeyWordExtractor,
    M: Matcher,
{
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let metrics = MetricsCollector::new();

    info!(
        run_id = %run_id,
        rows = samples.len(),
        workers = workers,
        "Batch starting"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("phish-guard-{i}"))
        .build()?;

    let outcomes: Vec<RowOutcome> = pool.install(|| {
        samples
            .par_iter()
            .enumerate()
            .map(|(index, sample)| {
                let outcome = diagnose_row(engine, index, sample);
                match &outcome {
                    Ok(diagnosis) => metrics.record_diagnosis(*diagnosis),
                    Err(e) => {
                        warn!(run_id = %run_id, row = index, error = %e.message, "Row failed");
                        metrics.record_row_error();
                    }
                }
                outcome
            })
            .collect()
    });

    let snapshot = metrics.snapshot();
    info!(
        run_id = %run_id,
        rows = snapshot.rows_processed,
        legitimate = snapshot.legitimate,
        potential_phishing = snapshot.potential_phishing,
        no_match = snapshot.no_match,
        row_errors = snapshot.row_errors,
        elapsed_ms = snapshot.elapsed_ms,
        "Batch complete"
    );

    Ok(BatchOutcome {
        run_id,
        started_at,
        finished_at: Utc::now(),
        outcomes,
        metrics: snapshot,
    })
}

/// Diagnose one row, turning errors and panics into a `RowError`.
fn diagnose_row<E, M>(engine: &DecisionEngine<E, M>, index: usize, sample: &Sample) -> RowOutcome
where
    E: KeyWordExtractor,
    M: Matcher,
{
    let _span = info_span!("sample", row = index).entered();

    match panic::catch_unwind(AssertUnwindSafe(|| {
        engine.diagnose(sample.sms(), sample.site())
    })) {
        Ok(Ok(diagnosis)) => Ok(diagnosis),
        Ok(Err(e)) => Err(RowError {
            index,
            message: e.to_string(),
        }),
        Err(payload) => Err(RowError {
            index,
            message: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Pair each sample with its outcome, in order.
pub fn diagnosed_rows(samples: Vec<Sample>, outcomes: &[RowOutcome]) -> Vec<DiagnosedSample> {
    samples
        .into_iter()
        .zip(outcomes)
        .map(|(sample, outcome)| DiagnosedSample::new(sample, outcome))
        .collect()
}

/// Write the input dataset plus a `diagnosis` column to `path`.
pub fn persist(
    path: &Path,
    samples: Vec<Sample>,
    outcomes: &[RowOutcome],
) -> Result<(), DatasetError> {
    let rows = diagnosed_rows(samples, outcomes);
    dataset::write_records(path, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "Diagnosed dataset written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{apple_whitelist, gazetteer};
    use crate::error::ExtractError;
    use crate::matcher::FuzzyMatcher;

    /// Gazetteer that fails on demand.
    struct Flaky;

    impl KeyWordExtractor for Flaky {
        fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError> {
            if text.contains("explode") {
                panic!("extractor blew up");
            }
            if text.contains("fail") {
                return Err(ExtractError::Inference("model unavailable".into()));
            }
            gazetteer().extract(text)
        }
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new("Your iPhone order shipped", "https://www.apple.com/track"),
            Sample::new("Apple ID locked", "https://www.appIe-support.net"),
            Sample::new("Meeting at 5pm", "https://example.com"),
            Sample::new("please fail here", "https://apple.com"),
            Sample::new("Banco do Brasil: token expirado", "https://bb.com.br/token"),
            Sample::new("this will explode", "https://apple.com"),
            Sample::new("bb: seu cartao foi bloqueado", "http://bb-seguranca.top"),
        ]
    }

    #[test]
    fn test_order_is_preserved_with_many_workers() {
        let engine = DecisionEngine::new(apple_whitelist(), gazetteer(), FuzzyMatcher::default());
        let samples = samples()
            .into_iter()
            .filter(|s| !s.sms().contains("fail") && !s.sms().contains("explode"))
            .collect::<Vec<_>>();

        let sequential = run_batch(&engine, &samples, 1).unwrap();
        let parallel = run_batch(&engine, &samples, 4).unwrap();

        let expected = vec![
            Diagnosis::Legitimate,
            Diagnosis::PotentialPhishing,
            Diagnosis::NoMatch,
            Diagnosis::Legitimate,
            Diagnosis::PotentialPhishing,
        ];
        let seq: Vec<Diagnosis> =
            sequential.outcomes.iter().map(|o| *o.as_ref().unwrap()).collect();
        let par: Vec<Diagnosis> =
            parallel.outcomes.iter().map(|o| *o.as_ref().unwrap()).collect();
        assert_eq!(seq, expected);
        assert_eq!(par, expected);
    }

    #[test]
    fn test_failures_are_isolated_per_row() {
        let engine = DecisionEngine::new(apple_whitelist(), Flaky, FuzzyMatcher::default());
        let samples = samples();
        let batch = run_batch(&engine, &samples, 3).unwrap();

        assert_eq!(batch.outcomes.len(), samples.len());
        assert_eq!(batch.outcomes[0].as_ref().unwrap(), &Diagnosis::Legitimate);

        let failed = batch.outcomes[3].as_ref().unwrap_err();
        assert_eq!(failed.index, 3);
        assert!(failed.message.contains("model unavailable"));

        let panicked = batch.outcomes[5].as_ref().unwrap_err();
        assert_eq!(panicked.index, 5);
        assert!(panicked.message.contains("extractor blew up"));

        assert_eq!(batch.outcomes[6].as_ref().unwrap(), &Diagnosis::PotentialPhishing);

        assert_eq!(batch.metrics.rows_processed, 7);
        assert_eq!(batch.metrics.row_errors, 2);
        assert_eq!(batch.metrics.legitimate, 2);
        assert_eq!(batch.metrics.potential_phishing, 2);
        assert_eq!(batch.metrics.no_match, 1);
    }

    #[test]
    fn test_empty_dataset() {
        let engine = DecisionEngine::new(apple_whitelist(), gazetteer(), FuzzyMatcher::default());
        let batch = run_batch(&engine, &[], 2).unwrap();
        assert!(batch.outcomes.is_empty());
        assert_eq!(batch.metrics.rows_processed, 0);
    }

    #[test]
    fn test_persist_writes_diagnosis_column() {
        let engine = DecisionEngine::new(apple_whitelist(), Flaky, FuzzyMatcher::default());
        let mut samples = samples();
        samples[0].set("sender", serde_json::Value::String("APPLE".into()));
        let batch = run_batch(&engine, &samples, 2).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnosed.json");
        persist(&path, samples, &batch.outcomes).unwrap();

        let rows: Vec<serde_json::Value> = dataset::read_records(&path).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0]["sender"], "APPLE");
        assert_eq!(rows[0]["diagnosis"], "Legitimate site.");
        assert_eq!(rows[1]["diagnosis"], "Potential phishing site.");
        assert_eq!(rows[2]["diagnosis"], "Matches not found");
        assert!(rows[3]["diagnosis"].is_null());
        assert!(rows[3]["error"].is_string());
        assert!(rows[2].get("error").is_none());
    }

    #[test]
    fn test_null_cells_still_get_a_diagnosis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("to_test.json");
        std::fs::write(
            &path,
            r#"[
                {"sms": "Your iPhone order shipped", "site": "https://www.apple.com/track"},
                {"sms": "Apple promo", "site": null},
                {"sms": null, "site": "https://apple.com"}
            ]"#,
        )
        .unwrap();

        let samples: Vec<Sample> = dataset::read_records(&path).unwrap();
        let engine = DecisionEngine::new(apple_whitelist(), gazetteer(), FuzzyMatcher::default());
        let batch = run_batch(&engine, &samples, 2).unwrap();

        let diagnoses: Vec<Diagnosis> =
            batch.outcomes.iter().map(|o| *o.as_ref().unwrap()).collect();
        assert_eq!(
            diagnoses,
            vec![Diagnosis::Legitimate, Diagnosis::PotentialPhishing, Diagnosis::NoMatch]
        );
    }

    #[test]
    fn test_report_carries_run_settings() {
        let engine = DecisionEngine::new(apple_whitelist(), gazetteer(), FuzzyMatcher::default());
        let batch = run_batch(&engine, &[Sample::new("Meeting at 5pm", "x.com")], 1).unwrap();
        let report = batch.report(0.59, 1);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["threshold"], 0.59);
        assert_eq!(value["metrics"]["no_match"], 1);
        assert_eq!(value["run_id"], batch.run_id.to_string());
    }
}
