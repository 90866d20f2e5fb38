//! Request handling around the engine
//!
//! The service owns the rule book, an optional result cache and the
//! expected API key. Failures inside the pipeline never escape: they are
//! logged and answered with a degraded response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::analysis::engine::DfmEngine;
use crate::analysis::scoring;
use crate::core::cache::ResultCache;
use crate::core::config::DEFAULT_WORKERS;
use crate::core::error::{DfmError, DfmResult};
use crate::core::rulebook::RuleBook;
use crate::entities::request::AnalyzeRequest;
use crate::entities::response::{AnalysisResponse, CostAnalysis, ProcessSuitability};

pub const DEGRADED_RECOMMENDATION: &str =
    "Fallback analysis due to an internal error. Check the request and retry.";

/// Running counters shared by every request
#[derive(Debug, Default)]
pub struct Metrics {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    total_micros: AtomicU64,
    peak_micros: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub average_ms: f64,
    pub peak_ms: f64,
}

impl Metrics {
    fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.peak_micros.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let micros = self.total_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            average_ms: if total == 0 {
                0.0
            } else {
                micros as f64 / total as f64 / 1000.0
            },
            peak_ms: self.peak_micros.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Outcome of a batch run, responses in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub responses: Vec<AnalysisResponse>,
    pub degraded: usize,
    pub cached: usize,
    pub elapsed_ms: f64,
    pub workers: usize,
    pub metrics: MetricsSnapshot,
}

/// The `/analyze` request handler
pub struct AnalysisService {
    rules: RuleBook,
    cache: Option<ResultCache>,
    api_key: Option<String>,
    workers: usize,
    metrics: Metrics,
}

impl AnalysisService {
    pub fn new(rules: RuleBook, cache: Option<ResultCache>, api_key: Option<String>) -> Self {
        Self {
            rules,
            cache,
            api_key: api_key.filter(|k| !k.is_empty()),
            workers: DEFAULT_WORKERS,
            metrics: Metrics::default(),
        }
    }

    /// Threads used by `analyze_batch`; zero means one
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Exact match against the configured key; no key configured means open
    pub fn authorize(&self, presented: Option<&str>) -> DfmResult<()> {
        match &self.api_key {
            None => Ok(()),
            Some(expected) if presented == Some(expected.as_str()) => Ok(()),
            Some(_) => {
                warn!("Rejected request with invalid API key");
                Err(DfmError::Unauthorized)
            }
        }
    }

    /// Authorize, then analyze
    pub fn handle(
        &self,
        presented_key: Option<&str>,
        request: &AnalyzeRequest,
    ) -> DfmResult<AnalysisResponse> {
        self.authorize(presented_key)?;
        Ok(self.analyze(request))
    }

    /// Analyze with cache lookup and store; always returns a response
    pub fn analyze(&self, request: &AnalyzeRequest) -> AnalysisResponse {
        let started = Instant::now();
        self.metrics.total.fetch_add(1, Ordering::Relaxed);
        let key = match ResultCache::key(request, self.rules.version) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Cannot derive cache key, bypassing the cache");
                None
            }
        };
        let cache = self.cache.as_ref().zip(key.as_deref());

        if let Some((c, key)) = cache {
            if let Some(mut hit) = c.get(key) {
                debug!(key, "Cache hit");
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                self.metrics.successful.fetch_add(1, Ordering::Relaxed);
                self.metrics.record(started.elapsed());
                hit.cached = true;
                return hit;
            }
        }

        let response = match DfmEngine::new(&self.rules).analyze(request) {
            Ok(response) => {
                if let Some((cache, key)) = cache {
                    if let Err(e) = cache.put(key, &response) {
                        warn!(error = %e, "Failed to store analysis in cache");
                    }
                }
                self.metrics.successful.fetch_add(1, Ordering::Relaxed);
                response
            }
            Err(e) => {
                warn!(
                    part = request.cad_data.part_name(),
                    error = %e,
                    "Analysis failed, returning degraded response"
                );
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                self.degraded(request, &e, started)
            }
        };
        self.metrics.record(started.elapsed());
        response
    }

    /// Analyze many requests on a bounded pool
    pub fn analyze_batch(&self, requests: &[AnalyzeRequest]) -> BatchReport {
        let started = Instant::now();
        info!(requests = requests.len(), workers = self.workers, "Starting batch");

        let responses: Vec<AnalysisResponse> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| requests.par_iter().map(|r| self.analyze(r)).collect()),
            Err(e) => {
                warn!(error = %e, "Could not start worker pool, analyzing sequentially");
                requests.iter().map(|r| self.analyze(r)).collect()
            }
        };

        let report = BatchReport {
            degraded: responses.iter().filter(|r| r.degraded).count(),
            cached: responses.iter().filter(|r| r.cached).count(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            workers: self.workers,
            metrics: self.metrics.snapshot(),
            responses,
        };
        info!(
            degraded = report.degraded,
            cached = report.cached,
            elapsed_ms = report.elapsed_ms,
            "Batch complete"
        );
        report
    }

    fn degraded(
        &self,
        request: &AnalyzeRequest,
        error: &DfmError,
        started: Instant,
    ) -> AnalysisResponse {
        let score = self.rules.degraded_score.max(0.0).min(100.0);
        let rating = scoring::rate(score, &self.rules);
        let process = request.process;

        AnalysisResponse {
            analysis_id: Ulid::new().to_string(),
            part_name: request.cad_data.part_name().to_string(),
            created_at: Utc::now(),
            manufacturability_score: score,
            overall_rating: rating,
            primary_process: ProcessSuitability {
                process,
                suitability_score: score,
                rating,
                estimated_unit_cost: 0.0,
                estimated_lead_time: self
                    .rules
                    .lead_time_days(process, request.production_volume),
                advantages: process.advantages().iter().map(|s| s.to_string()).collect(),
                limitations: process.limitations().iter().map(|s| s.to_string()).collect(),
            },
            manufacturing_issues: Vec::new(),
            cost_analysis: CostAnalysis {
                volume_discount: 1.0,
                production_volume: request.production_volume,
                ..Default::default()
            },
            process_recommendations: Vec::new(),
            expert_recommendations: vec![DEGRADED_RECOMMENDATION.to_string()],
            complexity: None,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            cached: false,
            degraded: true,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::geometry::Dimensions;
    use crate::entities::process::{Material, Process};
    use crate::entities::request::CadData;
    use crate::entities::response::Rating;
    use tempfile::tempdir;

    fn request(name: &str, dims: Dimensions) -> AnalyzeRequest {
        AnalyzeRequest::new(
            CadData {
                part_name: Some(name.to_string()),
                dimensions: dims,
                ..Default::default()
            },
            Material::Abs,
            Process::InjectionMolding,
        )
    }

    fn good_request() -> AnalyzeRequest {
        request("Housing", Dimensions::new(100.0, 50.0, 25.0))
    }

    fn bad_request() -> AnalyzeRequest {
        request("Broken", Dimensions::new(f64::NAN, 50.0, 25.0))
    }

    #[test]
    fn test_authorize() {
        let open = AnalysisService::new(RuleBook::default(), None, None);
        assert!(open.authorize(None).is_ok());
        assert!(open.authorize(Some("anything")).is_ok());

        let locked = AnalysisService::new(RuleBook::default(), None, Some("s3cret".to_string()));
        assert!(locked.authorize(Some("s3cret")).is_ok());
        assert!(matches!(locked.authorize(None), Err(DfmError::Unauthorized)));
        assert!(matches!(
            locked.authorize(Some("S3CRET")),
            Err(DfmError::Unauthorized)
        ));
        assert!(locked.handle(Some("wrong"), &good_request()).is_err());
    }

    #[test]
    fn test_empty_key_means_open() {
        let service = AnalysisService::new(RuleBook::default(), None, Some(String::new()));
        assert!(service.authorize(None).is_ok());
    }

    #[test]
    fn test_second_request_is_served_from_cache() {
        let tmp = tempdir().unwrap();
        let cache = ResultCache::open(tmp.path(), Duration::from_secs(3600)).unwrap();
        let service = AnalysisService::new(RuleBook::default(), Some(cache), None);

        let first = service.analyze(&good_request());
        let second = service.analyze(&good_request());

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.analysis_id, second.analysis_id);
        assert_eq!(first.manufacturability_score, second.manufacturability_score);

        let metrics = service.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.successful, 2);
    }

    #[test]
    fn test_failure_degrades() {
        let service = AnalysisService::new(RuleBook::default(), None, None);
        let response = service.analyze(&bad_request());

        assert!(response.degraded);
        assert_eq!(response.manufacturability_score, 70.0);
        assert_eq!(response.overall_rating, Rating::Fair);
        assert_eq!(response.part_name, "Broken");
        assert_eq!(response.expert_recommendations, vec![DEGRADED_RECOMMENDATION]);
        assert!(response.error.is_some());
        assert_eq!(service.metrics().failed, 1);
    }

    #[test]
    fn test_degraded_responses_are_not_cached() {
        let tmp = tempdir().unwrap();
        let cache = ResultCache::open(tmp.path(), Duration::from_secs(3600)).unwrap();
        let service = AnalysisService::new(RuleBook::default(), Some(cache), None);

        service.analyze(&bad_request());
        let again = service.analyze(&bad_request());
        assert!(!again.cached);
        assert_eq!(service.cache().unwrap().stats().unwrap().entries, 0);
    }

    #[test]
    fn test_missing_constraints_degrade() {
        let mut rules = RuleBook::default();
        rules.constraints.clear();
        let service = AnalysisService::new(rules, None, None);
        let response = service.analyze(&good_request());
        assert!(response.degraded);
        assert!(response.error.unwrap().contains("Rule evaluation failed"));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        crate::logging::init_test();
        let service = AnalysisService::new(RuleBook::default(), None, None).with_workers(4);
        let requests: Vec<AnalyzeRequest> = (0..12)
            .map(|i| {
                if i == 5 {
                    bad_request()
                } else {
                    request(&format!("Part {}", i), Dimensions::new(20.0 + i as f64, 20.0, 10.0))
                }
            })
            .collect();

        let report = service.analyze_batch(&requests);

        assert_eq!(report.responses.len(), 12);
        assert_eq!(report.workers, 4);
        assert_eq!(report.degraded, 1);
        for (i, response) in report.responses.iter().enumerate() {
            if i == 5 {
                assert!(response.degraded);
            } else {
                assert_eq!(response.part_name, format!("Part {}", i));
            }
        }
        assert_eq!(report.metrics.total_requests, 12);
        assert_eq!(report.metrics.failed, 1);
        assert!(report.metrics.peak_ms >= report.metrics.average_ms);
    }

    #[test]
    fn test_zero_workers_becomes_one() {
        let service = AnalysisService::new(RuleBook::default(), None, None).with_workers(0);
        assert_eq!(service.workers(), 1);
        let report = service.analyze_batch(&[good_request()]);
        assert_eq!(report.responses.len(), 1);
    }
}
