//! Cost Optimization Scan
//!
//! This module runs the full pipeline against any [`Collector`]:
//!
//! 1. **Authentication**: [`Collector::authenticate`], failing with the collector's reason
//! 2. **Billing**: billing records for the lookback window (a failure here is reported
//!    and the scan continues without cost data)
//! 3. **Inventory**: every visible resource
//! 4. **Detection**: [`detect_idle_resources`]
//! 5. **Recommendations**: [`RecommendationEngine`], prioritized and summarized
//! 6. **Analysis**: cost breakdown, budget forecast, anomalies and resource efficiency
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cloud_cost_optimizer::analyzer::{CostOptimizationAnalyzer, ScanOptions};
//! # use cloud_cost_optimizer::collector::Collector;
//!
//! # fn example(collector: &mut dyn Collector) -> anyhow::Result<()> {
//! let analyzer = CostOptimizationAnalyzer::new(ScanOptions::default());
//! let report = analyzer.scan(collector, "my-project")?;
//! println!("{} recommendations", report.recommendations.len());
//! # Ok(())
//! # }
//! ```

use crate::collector::Collector;
use crate::config::AnalysisConfig;
use crate::cost_analyzer::{
    budget_forecast, cost_breakdown, identify_anomalies, resource_efficiency, BudgetForecast,
    CostAnomaly, CostBreakdown, EfficiencyReport,
};
use crate::error::CollectorError;
use crate::idle_detector::{detect_idle_resources, IdleFlag};
use crate::models::{Recommendation, ResourceType};
use crate::recommendations::{prioritize, summarize, RecommendationEngine, RecommendationSummary};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub lookback_days: i64,
    pub anomaly_threshold_pct: f64,
    pub max_recommendations: Option<usize>,
    pub min_savings: f64,
    pub forecast_days: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for ScanOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            anomaly_threshold_pct: config.anomaly_threshold_pct,
            max_recommendations: (config.max_recommendations > 0).then_some(config.max_recommendations),
            min_savings: config.min_savings,
            forecast_days: config.forecast_days,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub project_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub billing_records: usize,
    /// Why billing collection failed, when it did
    pub billing_error: Option<String>,
    pub cost_breakdown: CostBreakdown,
    pub anomalies: Vec<CostAnomaly>,
    /// Absent when no billing data was collected
    pub budget_forecast: Option<BudgetForecast>,
    pub total_resources: usize,
    pub resources_by_type: BTreeMap<ResourceType, usize>,
    pub idle_resources: Vec<IdleFlag>,
    pub recommendations: Vec<Recommendation>,
    pub summary: RecommendationSummary,
    pub efficiency: EfficiencyReport,
}

pub struct CostOptimizationAnalyzer {
    options: ScanOptions,
}

impl CostOptimizationAnalyzer {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn scan(&self, collector: &mut dyn Collector, project_id: &str) -> Result<ScanReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("scan", %run_id, project_id);
        let _enter = span.enter();

        let window_end = Utc::now();
        let window_start = Duration::try_days(self.options.lookback_days)
            .and_then(|lookback| window_end.checked_sub_signed(lookback))
            .ok_or_else(|| {
                anyhow!(
                    "Lookback of {} days is out of range",
                    self.options.lookback_days
                )
            })?;

        if !collector.authenticate() {
            let reason = collector
                .last_error()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Authentication failed".to_string());
            return Err(anyhow!(reason));
        }

        let (billing, billing_error) = match collector.collect_billing_data(window_start, window_end) {
            Ok(records) => (records, None),
            Err(e @ CollectorError::InvalidRange { .. }) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Billing collection failed, continuing without cost data");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let resources = collector
            .collect_resource_data()
            .context("Failed to collect resource data")?;

        let mut resources_by_type = BTreeMap::new();
        for resource in &resources {
            *resources_by_type.entry(resource.resource_type).or_insert(0) += 1;
        }

        let idle_resources = detect_idle_resources(&resources);
        let engine = RecommendationEngine::new().with_billing(billing.clone());
        let recommendations = prioritize(
            engine.get_cost_optimization_recommendations(&resources, &idle_resources),
            self.options.max_recommendations,
            self.options.min_savings,
        );
        let summary = summarize(&recommendations);
        let efficiency = resource_efficiency(&resources, &idle_resources);

        info!(
            billing_records = billing.len(),
            resources = resources.len(),
            idle = idle_resources.len(),
            recommendations = recommendations.len(),
            "Scan complete"
        );

        Ok(ScanReport {
            run_id,
            project_id: project_id.to_string(),
            window_start,
            window_end,
            billing_records: billing.len(),
            billing_error,
            cost_breakdown: cost_breakdown(&billing),
            anomalies: identify_anomalies(&billing, self.options.anomaly_threshold_pct),
            budget_forecast: budget_forecast(&billing, self.options.forecast_days),
            total_resources: resources.len(),
            resources_by_type,
            idle_resources,
            recommendations,
            summary,
            efficiency,
        })
    }
}
