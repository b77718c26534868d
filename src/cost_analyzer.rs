//! Cost Analysis
//!
//! Aggregate views over collected billing data and resource inventories: where the
//! money goes, how two periods compare, what the next period may cost, which days
//! stand out, and how much of the inventory sits idle.

use crate::idle_detector::IdleFlag;
use crate::models::{BillingRecord, ResourceRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Deviation above which an anomaly is reported as high severity.
const HIGH_ANOMALY_DEVIATION_PCT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub name: String,
    pub cost: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub total_cost: f64,
    /// Sorted by cost, most expensive first
    pub services: Vec<ServiceCost>,
    pub top_cost_driver: Option<String>,
}

pub fn cost_breakdown(records: &[BillingRecord]) -> CostBreakdown {
    let mut by_service: HashMap<&str, f64> = HashMap::new();
    for record in records {
        *by_service.entry(record.service_name.as_str()).or_insert(0.0) += record.cost_amount;
    }
    let total: f64 = by_service.values().sum();

    let mut services: Vec<ServiceCost> = by_service
        .into_iter()
        .map(|(name, cost)| ServiceCost {
            name: name.to_string(),
            cost: round2(cost),
            percentage: if total > 0.0 { round2(cost / total * 100.0) } else { 0.0 },
        })
        .collect();
    services.sort_by(|a, b| {
        b.cost
            .partial_cmp(&a.cost)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    CostBreakdown {
        total_cost: round2(total),
        top_cost_driver: services.first().map(|s| s.name.clone()),
        services,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTrend {
    Increasing,
    Decreasing,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current_period_cost: f64,
    pub previous_period_cost: f64,
    pub absolute_change: f64,
    pub percentage_change: f64,
    pub trend: CostTrend,
}

pub fn compare_periods(current: &[BillingRecord], previous: &[BillingRecord]) -> PeriodComparison {
    let current_total: f64 = current.iter().map(|r| r.cost_amount).sum();
    let previous_total: f64 = previous.iter().map(|r| r.cost_amount).sum();

    let percentage_change = if previous_total == 0.0 {
        if current_total > 0.0 { 100.0 } else { 0.0 }
    } else {
        (current_total - previous_total) / previous_total * 100.0
    };

    let trend = match current_total.partial_cmp(&previous_total) {
        Some(std::cmp::Ordering::Greater) => CostTrend::Increasing,
        Some(std::cmp::Ordering::Less) => CostTrend::Decreasing,
        _ => CostTrend::Flat,
    };

    PeriodComparison {
        current_period_cost: round2(current_total),
        previous_period_cost: round2(previous_total),
        absolute_change: round2(current_total - previous_total),
        percentage_change: round2(percentage_change),
        trend,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Daily average over the observed days, extended over the forecast period
    SimpleMovingAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastConfidence {
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetForecast {
    pub historical_daily_average: f64,
    pub forecast_period_days: u32,
    pub forecasted_total: f64,
    pub confidence: ForecastConfidence,
    pub method: ForecastMethod,
    pub generated_at: DateTime<Utc>,
}

/// Forecast spend for the next `forecast_days` from the daily average over the days
/// `records` cover. `None` when there is no history to average.
pub fn budget_forecast(records: &[BillingRecord], forecast_days: u32) -> Option<BudgetForecast> {
    if records.is_empty() {
        return None;
    }

    let total: f64 = records.iter().map(|r| r.cost_amount).sum();
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.usage_start.date_naive()).collect();
    let daily_average = total / days.len().max(1) as f64;

    Some(BudgetForecast {
        historical_daily_average: round2(daily_average),
        forecast_period_days: forecast_days,
        forecasted_total: round2(daily_average * f64::from(forecast_days)),
        confidence: ForecastConfidence::Low,
        method: ForecastMethod::SimpleMovingAverage,
        generated_at: Utc::now(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnomaly {
    pub date: NaiveDate,
    pub cost: f64,
    pub average_cost: f64,
    pub deviation_percentage: f64,
    pub severity: AnomalySeverity,
}

/// Days whose total cost deviates from the daily mean by more than `threshold_pct`.
/// Costs are bucketed by the day `usage_start` falls on; fewer than two days yields nothing.
pub fn identify_anomalies(records: &[BillingRecord], threshold_pct: f64) -> Vec<CostAnomaly> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *daily.entry(record.usage_start.date_naive()).or_insert(0.0) += record.cost_amount;
    }
    if daily.len() < 2 {
        return Vec::new();
    }

    let average = daily.values().sum::<f64>() / daily.len() as f64;
    if average <= 0.0 {
        return Vec::new();
    }

    let anomalies: Vec<CostAnomaly> = daily
        .into_iter()
        .filter_map(|(date, cost)| {
            let deviation = (cost - average) / average * 100.0;
            if deviation.abs() <= threshold_pct {
                return None;
            }
            Some(CostAnomaly {
                date,
                cost: round2(cost),
                average_cost: round2(average),
                deviation_percentage: round2(deviation),
                severity: if deviation.abs() > HIGH_ANOMALY_DEVIATION_PCT {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                },
            })
        })
        .collect();

    info!(anomalies = anomalies.len(), "Identified cost anomalies");
    anomalies
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyReport {
    pub total_resources: usize,
    pub active_resources: usize,
    pub idle_resources: usize,
    pub utilization_rate: f64,
    pub efficiency_grade: char,
}

pub fn resource_efficiency(resources: &[ResourceRecord], idle_flags: &[IdleFlag]) -> EfficiencyReport {
    let total = resources.len();
    let idle = idle_flags.len().min(total);
    let utilization_rate = if total == 0 {
        0.0
    } else {
        (total - idle) as f64 / total as f64 * 100.0
    };

    EfficiencyReport {
        total_resources: total,
        active_resources: total - idle,
        idle_resources: idle,
        utilization_rate: round2(utilization_rate),
        efficiency_grade: efficiency_grade(utilization_rate),
    }
}

fn efficiency_grade(utilization_rate: f64) -> char {
    match utilization_rate {
        r if r >= 90.0 => 'A',
        r if r >= 80.0 => 'B',
        r if r >= 70.0 => 'C',
        r if r >= 60.0 => 'D',
        _ => 'F',
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
