//! Provider fallback orchestration
//!
//! Tries extraction providers one at a time, short-circuiting as soon as a
//! result meets the quality threshold so paid fallbacks are only invoked
//! when the cheaper path was not good enough. Attempts are strictly serial:
//! running providers concurrently would defeat the cost control that the
//! short-circuit exists for.

use despacho_domain::traits::ExtractionProvider;
use despacho_domain::{AttemptRecord, ExtractionResult, RawDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Terminal extraction error: every eligible provider failed outright.
///
/// Carries one attempt record per provider tried, so callers can surface
/// diagnostic detail ("which providers, why").
#[derive(Error, Debug)]
#[error("text extraction failed for '{file_name}' after {} attempt(s)", .attempts.len())]
pub struct ExtractionFailed {
    /// File the pipeline gave up on
    pub file_name: String,

    /// Full attempt history, in the order providers were tried
    pub attempts: Vec<AttemptRecord>,
}

/// Orchestrator policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Quality at or above which the chain stops (cost control)
    pub quality_threshold: f64,

    /// Extensions known to extract poorly offline; cloud providers go first
    pub prefer_cloud: Vec<String>,

    /// Per-provider attempt timeout (seconds); a timeout is a failure
    pub attempt_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.7,
            prefer_cloud: [".png", ".jpg", ".jpeg", ".tiff", ".bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            attempt_timeout_secs: 60,
        }
    }
}

impl OrchestratorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err("quality_threshold must be in [0, 1]".to_string());
        }
        if self.attempt_timeout_secs == 0 {
            return Err("attempt_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// The kept result plus the attempt history that produced it
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Best extraction result seen
    pub result: ExtractionResult,

    /// Every attempt made, in order
    pub attempts: Vec<AttemptRecord>,

    /// False when no provider reached the threshold and the best result is
    /// being returned with a low-confidence warning
    pub met_threshold: bool,
}

/// Tries providers in priority order with quality-gated short-circuiting
pub struct ProviderOrchestrator {
    providers: Vec<Arc<dyn ExtractionProvider>>,
    config: OrchestratorConfig,
}

impl ProviderOrchestrator {
    /// Build an orchestrator over an ordered provider list.
    ///
    /// Order is priority order; there is no further selection logic beyond
    /// the offline-first rule and format filtering.
    pub fn new(providers: Vec<Arc<dyn ExtractionProvider>>, config: OrchestratorConfig) -> Self {
        Self { providers, config }
    }

    /// Extract text from the document through the fallback chain.
    ///
    /// Returns the first result meeting the quality threshold, or the best
    /// result seen when nothing does. Errors only when *every* attempt
    /// failed outright.
    pub async fn extract(
        &self,
        document: &RawDocument,
    ) -> Result<ExtractionOutcome, ExtractionFailed> {
        let extension = document.extension();
        let ordered = self.eligible_providers(&extension);

        if ordered.is_empty() {
            warn!(file = %document.file_name, %extension, "no provider supports format");
            return Err(ExtractionFailed {
                file_name: document.file_name.clone(),
                attempts: Vec::new(),
            });
        }

        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(ordered.len());
        let mut best: Option<ExtractionResult> = None;

        for provider in ordered {
            let name = provider.name().to_string();
            let started = Instant::now();

            debug!(provider = %name, file = %document.file_name, "attempting extraction");
            let attempt = timeout(self.config.attempt_timeout(), provider.extract(document)).await;
            let elapsed = started.elapsed();

            match attempt {
                Err(_) => {
                    warn!(provider = %name, ?elapsed, "extraction attempt timed out");
                    attempts.push(AttemptRecord::failure(
                        &name,
                        elapsed,
                        format!("timed out after {:?}", self.config.attempt_timeout()),
                    ));
                }
                Ok(Err(e)) => {
                    warn!(provider = %name, "extraction attempt failed: {e}");
                    attempts.push(AttemptRecord::failure(&name, elapsed, e.to_string()));
                }
                Ok(Ok(result)) if !result.success => {
                    let reason = result
                        .error
                        .clone()
                        .unwrap_or_else(|| "provider reported failure".to_string());
                    warn!(provider = %name, "extraction attempt unsuccessful: {reason}");
                    attempts.push(AttemptRecord::failure(&name, elapsed, reason));
                }
                Ok(Ok(result)) => {
                    info!(
                        provider = %name,
                        quality = result.quality.value(),
                        cost = result.cost,
                        ?elapsed,
                        "extraction attempt completed"
                    );
                    attempts.push(AttemptRecord::scored(&name, elapsed, result.quality));

                    if result.quality.meets(self.config.quality_threshold) {
                        return Ok(ExtractionOutcome {
                            result,
                            attempts,
                            met_threshold: true,
                        });
                    }

                    let better = best
                        .as_ref()
                        .map_or(true, |b| result.quality > b.quality);
                    if better {
                        best = Some(result);
                    }
                }
            }
        }

        match best {
            // Nothing reached the threshold: extraction still "succeeds" so
            // the rest of the pipeline can produce a best-effort result.
            Some(result) => {
                warn!(
                    file = %document.file_name,
                    provider = %result.provider,
                    quality = result.quality.value(),
                    "no provider met quality threshold; keeping best result"
                );
                Ok(ExtractionOutcome {
                    result,
                    attempts,
                    met_threshold: false,
                })
            }
            None => Err(ExtractionFailed {
                file_name: document.file_name.clone(),
                attempts,
            }),
        }
    }

    /// Format-eligible providers in attempt order.
    ///
    /// Offline providers go first, except for formats on the prefer-cloud
    /// list, where they go last. Relative order within each group follows
    /// the declared priority order.
    fn eligible_providers(&self, extension: &str) -> Vec<Arc<dyn ExtractionProvider>> {
        let eligible = self
            .providers
            .iter()
            .filter(|p| p.supports(extension))
            .cloned();

        let (offline, cloud): (Vec<_>, Vec<_>) = eligible.partition(|p| p.offline());

        if self.config.prefer_cloud.iter().any(|e| e == extension) {
            cloud.into_iter().chain(offline).collect()
        } else {
            offline.into_iter().chain(cloud).collect()
        }
    }
}
