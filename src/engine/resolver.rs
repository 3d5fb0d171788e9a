//! Engine discovery: find an invocation of the conversion engine that works
//! on this host, and remember it.
//!
//! ## Resolution order
//!
//! ```text
//! cached? ──yes──▶ return it (including NotFound)
//!    │
//!    no
//!    ▼
//! detection helper ──prints a command, exit 0──▶ cache + return
//!    │
//!    unavailable (spawn error, non-zero exit, empty output, timeout)
//!    ▼
//! candidates, in order: `<cmd> --version`
//!    exit 0 and output contains the product marker ──▶ cache + return
//!    │
//!    all rejected
//!    ▼
//! cache + return NotFound
//! ```
//!
//! Every probe failure is swallowed and logged; only exhaustion is reported,
//! as [`ResolvedCommand::NotFound`]. The cached value is never re-probed
//! implicitly, even if the engine later disappears. Call
//! [`CommandResolver::reset`] after reinstalling.
//!
//! Concurrent first calls are not serialised: each racing caller may probe
//! once, and the first one to finish fixes the cached value.

use super::runner::{CommandOutput, CommandRunner, Invocation, RunError, SystemRunner};
use crate::config::{ConverterConfig, HelperCommand};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Preferred engine commands: generic alias, pinned versions newest first,
/// then the unversioned names.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "libreoffice-generic",
    "libreoffice25.2",
    "libreoffice24.8",
    "libreoffice24.2",
    "libreoffice7.6",
    "libreoffice7.5",
    "libreoffice7.4",
    "libreoffice7.3",
    "libreoffice7.2",
    "libreoffice7.1",
    "libreoffice7.0",
    "libreoffice6.4",
    "libreoffice6.3",
    "libreoffice6.2",
    "libreoffice6.1",
    "libreoffice6.0",
    "libreoffice",
    "soffice",
];

const VERSION_FLAG: &str = "--version";

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)+)\b").unwrap());

/// Ordered, most-preferred-first list of commands to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(candidates.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES.iter().copied())
    }
}

/// Outcome of a resolution cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedCommand {
    /// A working engine command. `version` is set when a `--version` probe parsed one.
    Found {
        command: String,
        version: Option<String>,
    },
    /// Every detection route was exhausted.
    NotFound,
}

impl ResolvedCommand {
    pub fn found(command: impl Into<String>) -> Self {
        Self::Found {
            command: command.into(),
            version: None,
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Found { command, .. } => Some(command),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Why a single probe was rejected.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("exited with status {0:?}")]
    NonZeroExit(Option<i32>),

    #[error("printed nothing")]
    EmptyOutput,

    #[error("output does not mention '{marker}': {first_line:?}")]
    Unrecognised { marker: String, first_line: String },
}

/// Where a probe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSource {
    Helper,
    Candidate,
}

/// One entry of a [`CommandResolver::diagnose`] report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    pub source: ProbeSource,
    /// The helper invocation, or the candidate command.
    pub command: String,
    pub accepted: bool,
    /// Resolved command from the helper, version for a candidate, or the rejection reason.
    pub detail: Option<String>,
}

/// Discovers and caches the engine command for the lifetime of the value.
///
/// Construct one per process and share it (`Arc`) with every converter.
pub struct CommandResolver {
    runner: Arc<dyn CommandRunner>,
    helper: Option<HelperCommand>,
    candidates: CandidateList,
    product_marker: String,
    probe_timeout: Duration,
    cache: RwLock<Option<ResolvedCommand>>,
}

impl std::fmt::Debug for CommandResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandResolver")
            .field("helper", &self.helper)
            .field("candidates", &self.candidates.len())
            .field("product_marker", &self.product_marker)
            .field("probe_timeout", &self.probe_timeout)
            .field("cache", &*self.cache.read())
            .finish()
    }
}

impl CommandResolver {
    pub fn new(config: &ConverterConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: &ConverterConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            helper: config.helper.clone(),
            candidates: config.candidates.clone(),
            product_marker: config.product_marker.clone(),
            probe_timeout: config.probe_timeout,
            cache: RwLock::new(None),
        }
    }

    /// Return the cached command, detecting it first if nothing is cached yet.
    pub async fn resolve(&self) -> ResolvedCommand {
        if let Some(cached) = self.cached() {
            return cached;
        }

        let detected = self.detect().await;

        let mut slot = self.cache.write();
        match slot.as_ref() {
            // Another caller finished first; keep its answer.
            Some(existing) => existing.clone(),
            None => {
                *slot = Some(detected.clone());
                detected
            }
        }
    }

    /// The cached value, without probing. `None` means not yet checked.
    pub fn cached(&self) -> Option<ResolvedCommand> {
        self.cache.read().clone()
    }

    /// Replace the cached value.
    pub fn set_cached(&self, value: ResolvedCommand) {
        *self.cache.write() = Some(value);
    }

    /// Forget the cached value so the next [`resolve`](Self::resolve) probes again.
    pub fn reset(&self) {
        if self.cache.write().take().is_some() {
            info!("Engine command cache cleared");
        }
    }

    /// Probe the helper and every candidate, reporting each attempt.
    ///
    /// Does not read or write the cache.
    pub async fn diagnose(&self) -> Vec<ProbeAttempt> {
        let mut attempts = Vec::with_capacity(self.candidates.len() + 1);

        if let Some(helper) = &self.helper {
            let result = self.run_helper(helper).await;
            attempts.push(ProbeAttempt {
                source: ProbeSource::Helper,
                command: helper.invocation().to_string(),
                accepted: result.is_ok(),
                detail: Some(match result {
                    Ok(cmd) => cmd,
                    Err(e) => e.to_string(),
                }),
            });
        }

        for candidate in self.candidates.iter() {
            let result = self.probe_candidate(candidate).await;
            attempts.push(ProbeAttempt {
                source: ProbeSource::Candidate,
                command: candidate.to_string(),
                accepted: result.is_ok(),
                detail: match result {
                    Ok(version) => version,
                    Err(e) => Some(e.to_string()),
                },
            });
        }

        attempts
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn detect(&self) -> ResolvedCommand {
        if let Some(helper) = &self.helper {
            match self.run_helper(helper).await {
                Ok(command) => {
                    info!("Found LibreOffice command via detection helper: {}", command);
                    return ResolvedCommand::found(command);
                }
                Err(e) => warn!("Could not use LibreOffice detection helper: {}", e),
            }
        }

        for candidate in self.candidates.iter() {
            match self.probe_candidate(candidate).await {
                Ok(version) => {
                    info!(
                        "Found working LibreOffice command: {} ({})",
                        candidate,
                        version.as_deref().unwrap_or("unknown version")
                    );
                    return ResolvedCommand::Found {
                        command: candidate.to_string(),
                        version,
                    };
                }
                Err(e) => debug!("Candidate {} rejected: {}", candidate, e),
            }
        }

        error!(
            "No working LibreOffice command found ({} candidates tried)",
            self.candidates.len()
        );
        ResolvedCommand::NotFound
    }

    async fn run_helper(&self, helper: &HelperCommand) -> Result<String, ProbeFailure> {
        let output = self
            .runner
            .run(&helper.invocation(), Some(self.probe_timeout))
            .await?;
        if !output.success() {
            return Err(ProbeFailure::NonZeroExit(output.exit_code));
        }
        first_non_empty_line(&output.stdout).ok_or(ProbeFailure::EmptyOutput)
    }

    /// Accepts the candidate when `--version` exits 0 and names the product.
    /// Returns the parsed version, if any.
    async fn probe_candidate(&self, candidate: &str) -> Result<Option<String>, ProbeFailure> {
        let invocation = Invocation::new(candidate).arg(VERSION_FLAG);
        let output = self
            .runner
            .run(&invocation, Some(self.probe_timeout))
            .await?;
        if !output.success() {
            return Err(ProbeFailure::NonZeroExit(output.exit_code));
        }
        if !output.stdout.contains(&self.product_marker) {
            return Err(ProbeFailure::Unrecognised {
                marker: self.product_marker.clone(),
                first_line: first_non_empty_line(&output.stdout).unwrap_or_default(),
            });
        }
        Ok(parse_version(&output))
    }
}

fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn parse_version(output: &CommandOutput) -> Option<String> {
    RE_VERSION
        .captures(&output.stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedRunner;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BANNER: &str = "LibreOffice 7.6.4.1 e19e193f88cd6c0525a17fb7a176ed8e6a3e2aa1\n";

    fn config(helper: Option<HelperCommand>, candidates: &[&str]) -> ConverterConfig {
        let mut c = ConverterConfig::default();
        c.helper = helper;
        c.candidates = CandidateList::new(candidates.iter().copied());
        c
    }

    /// Only `winner` answers `--version` with a LibreOffice banner.
    fn only(winner: &'static str) -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner::new(move |inv| {
            if inv.program == winner {
                Ok(ScriptedRunner::ok(BANNER))
            } else {
                Err(RunError::NotFound)
            }
        }))
    }

    #[tokio::test]
    async fn stops_at_first_accepted_candidate() {
        let runner = only("libreoffice7.6");
        let resolver = CommandResolver::with_runner(
            &config(None, &["libreoffice-generic", "libreoffice24.2", "libreoffice7.6", "soffice"]),
            runner.clone(),
        );

        let resolved = resolver.resolve().await;

        assert_eq!(resolved.command(), Some("libreoffice7.6"));
        assert_eq!(
            runner.programs(),
            vec!["libreoffice-generic", "libreoffice24.2", "libreoffice7.6"],
            "candidates after the accepted one must not be probed"
        );
        let inv = &runner.calls()[2];
        assert_eq!(inv.args, vec![std::ffi::OsString::from("--version")]);
    }

    #[tokio::test]
    async fn parses_version_from_banner() {
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), only("soffice"));
        assert_eq!(
            resolver.resolve().await,
            ResolvedCommand::Found {
                command: "soffice".into(),
                version: Some("7.6.4.1".into()),
            }
        );
    }

    #[tokio::test]
    async fn second_resolve_uses_cache() {
        let runner = only("soffice");
        let resolver =
            CommandResolver::with_runner(&config(None, &["libreoffice", "soffice"]), runner.clone());

        let first = resolver.resolve().await;
        let probes = runner.call_count();
        let second = resolver.resolve().await;

        assert_eq!(first, second);
        assert_eq!(runner.call_count(), probes, "second resolve must not probe");
    }

    #[tokio::test]
    async fn exhaustion_caches_not_found() {
        let runner = Arc::new(ScriptedRunner::new(|_| Err(RunError::NotFound)));
        let resolver =
            CommandResolver::with_runner(&config(None, &["libreoffice", "soffice"]), runner.clone());

        assert_eq!(resolver.resolve().await, ResolvedCommand::NotFound);
        assert_eq!(resolver.cached(), Some(ResolvedCommand::NotFound));
        assert_eq!(resolver.resolve().await, ResolvedCommand::NotFound);
        assert_eq!(runner.call_count(), 2);
    }

    /// Holds each probe until `parties` are in flight, then answers by arrival order.
    struct GatedRunner {
        gate: tokio::sync::Barrier,
        arrivals: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for GatedRunner {
        async fn run(
            &self,
            _invocation: &Invocation,
            _timeout: Option<Duration>,
        ) -> Result<CommandOutput, RunError> {
            let arrival = self.arrivals.fetch_add(1, Ordering::SeqCst);
            self.gate.wait().await;
            Ok(ScriptedRunner::ok(if arrival == 0 {
                "LibreOffice 7.6.4.1\n"
            } else {
                "LibreOffice 24.2.0.3\n"
            }))
        }
    }

    #[tokio::test]
    async fn concurrent_first_resolves_agree() {
        let runner = Arc::new(GatedRunner {
            gate: tokio::sync::Barrier::new(2),
            arrivals: AtomicUsize::new(0),
        });
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), runner.clone());

        let (a, b) = tokio::join!(resolver.resolve(), resolver.resolve());

        assert_eq!(runner.arrivals.load(Ordering::SeqCst), 2, "both callers probed");
        assert!(a.is_found());
        assert_eq!(a, b, "later finisher must adopt the cached answer");
        assert_eq!(resolver.cached(), Some(a));
    }

    #[tokio::test]
    async fn reset_clears_not_found_and_reprobes() {
        let runner = Arc::new(ScriptedRunner::new(|_| Err(RunError::NotFound)));
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), runner.clone());

        resolver.resolve().await;
        assert_eq!(runner.call_count(), 1);

        resolver.reset();
        assert_eq!(resolver.cached(), None);

        resolver.resolve().await;
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn reset_after_forced_value() {
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), only("soffice"));
        resolver.set_cached(ResolvedCommand::NotFound);
        assert_eq!(resolver.resolve().await, ResolvedCommand::NotFound);

        resolver.reset();
        assert_eq!(resolver.resolve().await.command(), Some("soffice"));
    }

    #[tokio::test]
    async fn helper_output_wins_without_probing_candidates() {
        let runner = Arc::new(ScriptedRunner::new(|inv| {
            if inv.program == "soffice-locate" {
                Ok(ScriptedRunner::ok("/opt/libreoffice7.6/program/soffice\n"))
            } else {
                Err(RunError::NotFound)
            }
        }));
        let resolver = CommandResolver::with_runner(
            &config(Some(HelperCommand::default()), &["libreoffice", "soffice"]),
            runner.clone(),
        );

        let resolved = resolver.resolve().await;

        assert_eq!(resolved.command(), Some("/opt/libreoffice7.6/program/soffice"));
        assert_eq!(runner.programs(), vec!["soffice-locate"]);
    }

    #[tokio::test]
    async fn helper_failures_fall_through() {
        let outcomes: Vec<fn() -> Result<CommandOutput, RunError>> = vec![
            || Err(RunError::NotFound),
            || Err(RunError::TimedOut(Duration::from_secs(10))),
            || Ok(ScriptedRunner::exit(1, "/usr/bin/soffice")),
            || Ok(ScriptedRunner::ok("   \n")),
        ];

        for helper_outcome in outcomes {
            let runner = Arc::new(ScriptedRunner::new(move |inv| {
                if inv.program == "soffice-locate" {
                    helper_outcome()
                } else if inv.program == "soffice" {
                    Ok(ScriptedRunner::ok(BANNER))
                } else {
                    Err(RunError::NotFound)
                }
            }));
            let resolver = CommandResolver::with_runner(
                &config(Some(HelperCommand::default()), &["soffice"]),
                runner.clone(),
            );
            assert_eq!(resolver.resolve().await.command(), Some("soffice"));
            assert_eq!(runner.programs(), vec!["soffice-locate", "soffice"]);
        }
    }

    #[tokio::test]
    async fn rejects_unrelated_binary_and_non_zero_exit() {
        let runner = Arc::new(ScriptedRunner::new(|inv| match inv.program.as_str() {
            // Same name, different program.
            "libreoffice" => Ok(ScriptedRunner::ok("libreoffice-launcher 1.0\n")),
            "libreoffice7.6" => Ok(ScriptedRunner::exit(1, BANNER)),
            "soffice" => Ok(ScriptedRunner::ok(BANNER)),
            _ => Err(RunError::NotFound),
        }));
        let resolver = CommandResolver::with_runner(
            &config(None, &["libreoffice", "libreoffice7.6", "soffice"]),
            runner,
        );
        assert_eq!(resolver.resolve().await.command(), Some("soffice"));
    }

    #[tokio::test]
    async fn diagnose_reports_every_attempt_without_caching() {
        let runner = only("soffice");
        let resolver = CommandResolver::with_runner(
            &config(Some(HelperCommand::default()), &["libreoffice", "soffice"]),
            runner,
        );

        let report = resolver.diagnose().await;

        assert_eq!(report.len(), 3);
        assert_eq!(report[0].source, ProbeSource::Helper);
        assert!(!report[0].accepted);
        assert_eq!(report[1].command, "libreoffice");
        assert!(!report[1].accepted);
        assert!(report[2].accepted);
        assert_eq!(report[2].detail.as_deref(), Some("7.6.4.1"));
        assert_eq!(resolver.cached(), None);
    }

    #[test]
    fn default_candidate_order() {
        let list = CandidateList::default();
        assert_eq!(list.len(), DEFAULT_CANDIDATES.len());
        let names: Vec<&str> = list.iter().collect();
        assert_eq!(names.first(), Some(&"libreoffice-generic"));
        assert_eq!(&names[names.len() - 2..], &["libreoffice", "soffice"]);
        let pos = |n: &str| names.iter().position(|c| *c == n).unwrap();
        assert!(pos("libreoffice25.2") < pos("libreoffice7.6"));
        assert!(pos("libreoffice7.0") < pos("libreoffice6.4"));
    }

    #[tokio::test]
    async fn reports_serialise_for_detect_json() {
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), only("soffice"));

        let resolved = serde_json::to_value(resolver.resolve().await).unwrap();
        assert_eq!(resolved["status"], "found");
        assert_eq!(resolved["command"], "soffice");

        let missing = serde_json::to_value(ResolvedCommand::NotFound).unwrap();
        assert_eq!(missing, serde_json::json!({ "status": "not_found" }));

        let report = serde_json::to_value(resolver.diagnose().await).unwrap();
        assert_eq!(report[0]["source"], "candidate");
        assert_eq!(report[0]["accepted"], true);
    }

    #[test]
    fn resolve_from_sync_context() {
        let resolver = CommandResolver::with_runner(&config(None, &["soffice"]), only("soffice"));
        let resolved = tokio_test::block_on(resolver.resolve());
        assert!(resolved.is_found());
    }
}
