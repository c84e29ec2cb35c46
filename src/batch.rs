//! Batch checking: one session, sequential probes, paced requests
//!
//! One long-lived browser session is reused for every entry; checks never
//! run concurrently because the signup flow is stateful per page. Pacing
//! between entries is base delay plus uniform jitter.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;

use crate::browser::CheckerSession;
use crate::classify::Outcome;
use crate::parse::Entry;
use crate::probe::{BrowserProbe, ProbeConfig, SignupProbe};

/// Categorized raw input lines, insertion order = processing order.
/// Each entry lands in exactly one bucket.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ResultSet {
    pub registered: Vec<String>,
    pub available: Vec<String>,
    pub invalid: Vec<String>,
    pub error: Vec<String>,
}

impl ResultSet {
    /// File a raw line under its outcome.
    pub fn push(&mut self, outcome: Outcome, line: String) {
        match outcome {
            Outcome::Registered => self.registered.push(line),
            Outcome::Available => self.available.push(line),
            Outcome::Invalid => self.invalid.push(line),
            Outcome::Error => self.error.push(line),
        }
    }

    /// Total lines across all buckets.
    pub fn total(&self) -> usize {
        self.registered.len() + self.available.len() + self.invalid.len() + self.error.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Caller-supplied progress sink, invoked once per processed entry with a
/// 1-based index. The loop awaits each invocation; throttling and display
/// policy live entirely in the implementation.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, current: usize, total: usize, email: &str, outcome: Outcome);
}

/// Inter-entry pacing.
#[derive(Debug, Clone)]
pub struct PaceConfig {
    /// Base delay between entries, in seconds. Jitter is added on top.
    pub base_delay_secs: f64,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 2.0,
        }
    }
}

impl PaceConfig {
    /// Base delay plus uniform jitter from [0.5, 1.5) seconds.
    /// Never less than the base delay.
    pub fn delay(&self) -> Duration {
        let jitter: f64 = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64(self.base_delay_secs + jitter)
    }
}

/// Run the probe over every entry in order, filing each raw line under its
/// outcome and reporting progress. A probe `Err` is folded into the error
/// bucket; nothing is dropped or duplicated.
pub async fn check_entries<P: SignupProbe>(
    probe: &mut P,
    entries: &[Entry],
    reporter: Option<&dyn ProgressReporter>,
    pace: &PaceConfig,
) -> ResultSet {
    let mut results = ResultSet::default();
    let total = entries.len();

    for (i, entry) in entries.iter().enumerate() {
        let current = i + 1;

        let outcome = match probe.check(&entry.email).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(email = %entry.email, error = %e, "probe fault");
                Outcome::Error
            }
        };

        results.push(outcome, entry.line.clone());
        tracing::info!("[{}/{}] {} -> {}", current, total, entry.email, outcome);

        if let Some(reporter) = reporter {
            reporter.report(current, total, &entry.email, outcome).await;
        }

        if current < total {
            tokio::time::sleep(pace.delay()).await;
        }
    }

    results
}

/// One end-to-end batch run: launch a session, check every entry, tear the
/// session down. A launch failure is logged and yields empty buckets rather
/// than an error; the caller only ever sees a ResultSet.
pub async fn run_batch(
    entries: &[Entry],
    reporter: Option<&dyn ProgressReporter>,
    probe_config: ProbeConfig,
    pace: &PaceConfig,
) -> ResultSet {
    let session = match CheckerSession::launch().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to start browser session");
            return ResultSet::default();
        }
    };

    let mut probe = BrowserProbe::new(session, probe_config);
    let results = check_entries(&mut probe, entries, reporter, pace).await;

    if let Err(e) = probe.into_session().close().await {
        tracing::warn!(error = %e, "browser close failed");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct ScriptedProbe {
        script: VecDeque<Result<Outcome>>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Result<Outcome>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    #[async_trait]
    impl SignupProbe for ScriptedProbe {
        async fn check(&mut self, _email: &str) -> Result<Outcome> {
            self.script.pop_front().expect("script exhausted")
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<(usize, usize, String, Outcome)>>,
    }

    #[async_trait]
    impl ProgressReporter for RecordingReporter {
        async fn report(&self, current: usize, total: usize, email: &str, outcome: Outcome) {
            self.events
                .lock()
                .await
                .push((current, total, email.to_string(), outcome));
        }
    }

    fn entries(lines: &[&str]) -> Vec<Entry> {
        crate::parse::parse_entries(&lines.join("\n"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_entry_lands_in_exactly_one_bucket() {
        let input = entries(&["a@x.com", "b@x.com:pw", "c@x.com", "d@x.com"]);
        let mut probe = ScriptedProbe::new(vec![
            Ok(Outcome::Registered),
            Ok(Outcome::Available),
            Ok(Outcome::Invalid),
            Ok(Outcome::Error),
        ]);

        let results = check_entries(&mut probe, &input, None, &PaceConfig::default()).await;

        assert_eq!(results.total(), input.len());
        assert_eq!(results.registered, vec!["a@x.com"]);
        assert_eq!(results.available, vec!["b@x.com:pw"]);
        assert_eq!(results.invalid, vec!["c@x.com"]);
        assert_eq!(results.error, vec!["d@x.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_folds_into_error_bucket() {
        let input = entries(&["a@x.com"]);
        let mut probe = ScriptedProbe::new(vec![Err(anyhow::anyhow!("boom"))]);

        let results = check_entries(&mut probe, &input, None, &PaceConfig::default()).await;

        assert_eq!(results.error, vec!["a@x.com"]);
        assert_eq!(results.total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_indices_are_strictly_increasing() {
        let input = entries(&["a@x.com", "b@x.com", "c@x.com"]);
        let mut probe = ScriptedProbe::new(vec![
            Ok(Outcome::Available),
            Ok(Outcome::Available),
            Ok(Outcome::Available),
        ]);
        let reporter = RecordingReporter::default();

        check_entries(&mut probe, &input, Some(&reporter), &PaceConfig::default()).await;

        let events = reporter.events.lock().await;
        assert_eq!(events.len(), 3);
        for (i, (current, total, email, _)) in events.iter().enumerate() {
            assert_eq!(*current, i + 1);
            assert_eq!(*total, 3);
            assert_eq!(email, &input[i].email);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcomes_end_to_end() {
        // registered, available, then a probe fault: buckets [1],[2],[3]
        // and three progress calls with indices 1,2,3.
        let input = entries(&["one@x.com", "two@x.com", "three@x.com"]);
        let mut probe = ScriptedProbe::new(vec![
            Ok(Outcome::Registered),
            Ok(Outcome::Available),
            Err(anyhow::anyhow!("navigation timeout")),
        ]);
        let reporter = RecordingReporter::default();

        let results =
            check_entries(&mut probe, &input, Some(&reporter), &PaceConfig::default()).await;

        assert_eq!(results.registered, vec!["one@x.com"]);
        assert_eq!(results.available, vec!["two@x.com"]);
        assert_eq!(results.error, vec!["three@x.com"]);

        let events = reporter.events.lock().await;
        let indices: Vec<usize> = events.iter().map(|e| e.0).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(events[2].3, Outcome::Error);
    }

    #[tokio::test]
    async fn test_empty_entry_list_yields_empty_buckets() {
        let mut probe = ScriptedProbe::new(vec![]);
        let results = check_entries(&mut probe, &[], None, &PaceConfig::default()).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_pace_delay_is_at_least_base_plus_min_jitter() {
        let pace = PaceConfig {
            base_delay_secs: 2.0,
        };
        for _ in 0..100 {
            let d = pace.delay();
            assert!(d >= Duration::from_secs_f64(2.5));
            assert!(d < Duration::from_secs_f64(3.5));
        }
    }

    #[test]
    fn test_result_set_serializes_with_four_buckets() {
        let mut results = ResultSet::default();
        results.push(Outcome::Registered, "a@x.com".into());
        let json = serde_json::to_string(&results).unwrap();
        assert!(json.contains(r#""registered":["a@x.com"]"#));
        assert!(json.contains(r#""error":[]"#));
    }
}
