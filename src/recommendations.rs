//! Recommendation Engine
//!
//! Converts idle-detector output into typed [`Recommendation`] records with a severity,
//! a short imperative action and, when billing data allows it, an estimated monthly
//! saving.
//!
//! ## Severity Mapping
//!
//! - Stopped / suspended instance → [`Severity::Medium`]
//! - Terminated instance still billed for attached resources → [`Severity::High`]
//! - Unattached disk → [`Severity::Low`]
//!
//! ## Savings Attribution
//!
//! Billing records attached with [`RecommendationEngine::with_billing`] are joined to
//! resources by their attributed resource id. The matched cost is scaled to a 30-day
//! month over the span the matched records cover. Resources with no attributed cost, or
//! with costs in more than one currency, get no estimate.
//!
//! ## Usage Example
//!
//! ```rust
//! use cloud_cost_optimizer::idle_detector::detect_idle_resources;
//! use cloud_cost_optimizer::recommendations::RecommendationEngine;
//! use cloud_cost_optimizer::models::{ResourceRecord, ResourceState, ResourceType};
//!
//! let resources = vec![ResourceRecord::new(
//!     "i1", ResourceType::ComputeInstance, "web-1", "demo", ResourceState::Stopped,
//! )];
//! let flags = detect_idle_resources(&resources);
//! let recommendations = RecommendationEngine::new()
//!     .get_cost_optimization_recommendations(&resources, &flags);
//! assert_eq!(recommendations.len(), 1);
//! ```

use crate::idle_detector::{IdleFlag, IdleReason};
use crate::models::{BillingRecord, Recommendation, ResourceRecord, ResourceState, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const DAYS_PER_MONTH: f64 = 30.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

pub fn severity_for(reason: IdleReason) -> Severity {
    match reason {
        IdleReason::InstanceStopped | IdleReason::InstanceSuspended => Severity::Medium,
        IdleReason::InstanceTerminated => Severity::High,
        IdleReason::UnattachedDisk => Severity::Low,
    }
}

pub fn action_for(reason: IdleReason) -> &'static str {
    match reason {
        IdleReason::InstanceStopped | IdleReason::InstanceSuspended => {
            "Review and delete if no longer needed"
        }
        IdleReason::InstanceTerminated => {
            "Review attached disks and addresses, then delete the instance if no longer needed"
        }
        IdleReason::UnattachedDisk => "Snapshot if the data is needed, then delete the disk",
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    billing: Vec<BillingRecord>,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Billing records used for cost attribution.
    pub fn with_billing(mut self, records: Vec<BillingRecord>) -> Self {
        self.billing = records;
        self
    }

    /// One recommendation per flag whose resource is present in `resources` with a
    /// known state. Output order follows `idle_flags`.
    pub fn get_cost_optimization_recommendations(
        &self,
        resources: &[ResourceRecord],
        idle_flags: &[IdleFlag],
    ) -> Vec<Recommendation> {
        let by_id: HashMap<&str, &ResourceRecord> = resources
            .iter()
            .map(|r| (r.resource_id.as_str(), r))
            .collect();

        let recommendations: Vec<Recommendation> = idle_flags
            .iter()
            .filter_map(|flag| {
                let Some(resource) = by_id.get(flag.resource.resource_id.as_str()) else {
                    debug!(resource_id = %flag.resource.resource_id, "Flag references an unknown resource, skipping");
                    return None;
                };
                if resource.state == ResourceState::Unknown {
                    return None;
                }
                Some(Recommendation {
                    resource_id: resource.resource_id.clone(),
                    resource_name: resource.name.clone(),
                    resource_type: resource.resource_type,
                    recommendation_text: flag.reason.message().to_string(),
                    action_text: action_for(flag.reason).to_string(),
                    severity: severity_for(flag.reason),
                    estimated_monthly_savings: self.estimate_monthly_savings(resource),
                })
            })
            .collect();

        info!(
            flags = idle_flags.len(),
            recommendations = recommendations.len(),
            "Generated cost optimization recommendations"
        );
        recommendations
    }

    /// Monthly cost attributed to `resource`, or `None` when nothing can be attributed.
    pub fn estimate_monthly_savings(&self, resource: &ResourceRecord) -> Option<f64> {
        let matched: Vec<&BillingRecord> = self
            .billing
            .iter()
            .filter(|record| {
                record
                    .resource_id
                    .as_deref()
                    .is_some_and(|id| resource.matches_billing(id))
            })
            .collect();

        let first = matched.first()?;
        if matched.iter().any(|r| r.currency != first.currency) {
            debug!(resource_id = %resource.resource_id, "Attributed costs span several currencies");
            return None;
        }

        let total: f64 = matched.iter().map(|r| r.cost_amount).sum();
        if total < 0.0 {
            return None;
        }

        let start = matched.iter().map(|r| r.usage_start).min()?;
        let end = matched.iter().map(|r| r.usage_end).max()?;
        let days = covered_days(start, end);

        Some(round_cents(total / days * DAYS_PER_MONTH))
    }
}

fn covered_days(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let seconds = (end - start).num_seconds().max(0) as f64;
    (seconds / SECONDS_PER_DAY).max(1.0)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sort by severity (highest first), then by estimated savings (largest first, unknown
/// last). A positive `min_savings` drops recommendations without an estimate.
pub fn prioritize(
    mut recommendations: Vec<Recommendation>,
    max_recommendations: Option<usize>,
    min_savings: f64,
) -> Vec<Recommendation> {
    if min_savings > 0.0 {
        recommendations.retain(|r| r.estimated_monthly_savings.is_some_and(|s| s >= min_savings));
    }

    recommendations.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| compare_savings(a.estimated_monthly_savings, b.estimated_monthly_savings))
    });

    if let Some(max) = max_recommendations {
        recommendations.truncate(max);
    }
    recommendations
}

fn compare_savings(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSummary {
    pub total_recommendations: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub with_savings_estimate: usize,
    pub total_monthly_savings: f64,
    pub total_annual_savings: f64,
    pub generated_at: DateTime<Utc>,
}

pub fn summarize(recommendations: &[Recommendation]) -> RecommendationSummary {
    let mut by_severity = BTreeMap::new();
    for rec in recommendations {
        *by_severity.entry(rec.severity).or_insert(0) += 1;
    }

    let estimates: Vec<f64> = recommendations
        .iter()
        .filter_map(|r| r.estimated_monthly_savings)
        .collect();
    let monthly: f64 = estimates.iter().sum();

    RecommendationSummary {
        total_recommendations: recommendations.len(),
        by_severity,
        with_savings_estimate: estimates.len(),
        total_monthly_savings: round_cents(monthly),
        total_annual_savings: round_cents(monthly * 12.0),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idle_detector::detect_idle_resources;
    use crate::models::{ResourceType, METADATA_ATTACHED, METADATA_BILLING_NAME};
    use chrono::TimeZone;

    fn billed(resource_id: &str, day: u32, days: u32, cost: f64, currency: &str) -> BillingRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        BillingRecord {
            service_name: "Compute Engine".to_string(),
            sku_description: "Storage PD Capacity".to_string(),
            usage_start: start,
            usage_end: start + chrono::Duration::days(days as i64),
            cost_amount: cost,
            currency: currency.to_string(),
            project_id: "demo".to_string(),
            resource_id: Some(resource_id.to_string()),
        }
    }

    fn rec(id: &str, severity: Severity, savings: Option<f64>) -> Recommendation {
        Recommendation {
            resource_id: id.to_string(),
            resource_name: id.to_string(),
            resource_type: ResourceType::ComputeInstance,
            recommendation_text: String::new(),
            action_text: String::new(),
            severity,
            estimated_monthly_savings: savings,
        }
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(IdleReason::InstanceStopped), Severity::Medium);
        assert_eq!(severity_for(IdleReason::InstanceSuspended), Severity::Medium);
        assert_eq!(severity_for(IdleReason::InstanceTerminated), Severity::High);
        assert_eq!(severity_for(IdleReason::UnattachedDisk), Severity::Low);
    }

    #[test]
    fn test_savings_absent_without_billing() {
        let disk = ResourceRecord::new("d1", ResourceType::Disk, "d1", "demo", ResourceState::Running)
            .with_metadata(METADATA_ATTACHED, "false");
        let resources = vec![disk];
        let flags = detect_idle_resources(&resources);
        let recs = RecommendationEngine::new().get_cost_optimization_recommendations(&resources, &flags);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].estimated_monthly_savings, None);
    }

    #[test]
    fn test_savings_scaled_to_month() {
        let disk = ResourceRecord::new("d1", ResourceType::Disk, "d1", "demo", ResourceState::Running);
        let engine = RecommendationEngine::new().with_billing(vec![
            billed("d1", 1, 5, 1.0, "USD"),
            billed("d1", 6, 5, 1.0, "USD"),
            billed("other", 1, 10, 99.0, "USD"),
        ]);
        // 2.00 over 10 days
        assert_eq!(engine.estimate_monthly_savings(&disk), Some(6.0));
    }

    #[test]
    fn test_savings_joins_on_billing_name() {
        let instance = ResourceRecord::new(
            "//compute.googleapis.com/projects/demo/zones/z/instances/web-1",
            ResourceType::ComputeInstance,
            "web-1",
            "demo",
            ResourceState::Stopped,
        )
        .with_metadata(METADATA_BILLING_NAME, "//compute.googleapis.com/projects/demo/zones/z/instances/42");
        let engine = RecommendationEngine::new().with_billing(vec![billed(
            "//compute.googleapis.com/projects/demo/zones/z/instances/42",
            1,
            30,
            12.5,
            "USD",
        )]);
        assert_eq!(engine.estimate_monthly_savings(&instance), Some(12.5));
    }

    #[test]
    fn test_short_windows_count_as_one_day() {
        let disk = ResourceRecord::new("d1", ResourceType::Disk, "d1", "demo", ResourceState::Running);
        let mut hourly = billed("d1", 1, 0, 0.1, "USD");
        hourly.usage_end = hourly.usage_start + chrono::Duration::hours(1);
        let engine = RecommendationEngine::new().with_billing(vec![hourly]);
        assert_eq!(engine.estimate_monthly_savings(&disk), Some(3.0));
    }

    #[test]
    fn test_mixed_currency_has_no_estimate() {
        let disk = ResourceRecord::new("d1", ResourceType::Disk, "d1", "demo", ResourceState::Running);
        let engine = RecommendationEngine::new().with_billing(vec![
            billed("d1", 1, 5, 1.0, "USD"),
            billed("d1", 6, 5, 1.0, "EUR"),
        ]);
        assert_eq!(engine.estimate_monthly_savings(&disk), None);
    }

    #[test]
    fn test_flags_for_missing_or_unknown_resources_dropped() {
        let stopped = ResourceRecord::new("i1", ResourceType::ComputeInstance, "i1", "demo", ResourceState::Stopped);
        let flags = detect_idle_resources(&[stopped.clone()]);

        let recs = RecommendationEngine::new().get_cost_optimization_recommendations(&[], &flags);
        assert!(recs.is_empty());

        let mut now_unknown = stopped;
        now_unknown.state = ResourceState::Unknown;
        let recs = RecommendationEngine::new().get_cost_optimization_recommendations(&[now_unknown], &flags);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_prioritize_order_and_limits() {
        let recs = vec![
            rec("low", Severity::Low, Some(50.0)),
            rec("med-none", Severity::Medium, None),
            rec("med-big", Severity::Medium, Some(40.0)),
            rec("high", Severity::High, Some(1.0)),
        ];

        let ordered: Vec<String> = prioritize(recs.clone(), None, 0.0)
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        assert_eq!(ordered, vec!["high", "med-big", "med-none", "low"]);

        let limited = prioritize(recs.clone(), Some(2), 0.0);
        assert_eq!(limited.len(), 2);

        let filtered: Vec<String> = prioritize(recs, None, 10.0)
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        assert_eq!(filtered, vec!["med-big", "low"]);
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&[
            rec("a", Severity::Medium, Some(10.0)),
            rec("b", Severity::Medium, None),
            rec("c", Severity::Low, Some(2.5)),
        ]);
        assert_eq!(summary.total_recommendations, 3);
        assert_eq!(summary.by_severity[&Severity::Medium], 2);
        assert_eq!(summary.by_severity[&Severity::Low], 1);
        assert!(!summary.by_severity.contains_key(&Severity::High));
        assert_eq!(summary.with_savings_estimate, 2);
        assert_eq!(summary.total_monthly_savings, 12.5);
        assert_eq!(summary.total_annual_savings, 150.0);
    }
}
