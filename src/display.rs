//! Output Formatting and Display Management
//!
//! Renders a [`ScanReport`] either as coloured terminal output or as pretty JSON for
//! programmatic consumption.
//!
//! ## Terminal Layout
//!
//! - **Header**: project and collection window
//! - **Billing**: total cost and per-service breakdown, the budget forecast, then cost anomalies
//! - **Inventory**: resource counts per type and the idle resources found
//! - **Recommendations**: severity, resource, reason, action and estimated saving
//! - **Summary**: totals and the resource efficiency grade

use crate::analyzer::ScanReport;
use crate::models::Severity;
use colored::{ColoredString, Colorize};

const WIDTH: usize = 70;
const TOP_SERVICES: usize = 10;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_scan(&self, report: &ScanReport, json_output: bool) {
        if json_output {
            match serde_json::to_string_pretty(report) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing scan report to JSON: {}", e),
            }
            return;
        }

        self.header("Cloud Cost Optimizer");
        println!("Project: {}", report.project_id.bright_white().bold());
        println!(
            "Window:  {} to {}",
            report.window_start.format("%Y-%m-%d"),
            report.window_end.format("%Y-%m-%d")
        );

        self.display_billing(report);
        self.display_inventory(report);
        self.display_recommendations(report);
        self.display_summary(report);
    }

    fn display_billing(&self, report: &ScanReport) {
        self.section("Billing");

        if let Some(error) = &report.billing_error {
            println!("{} {}", "Billing data unavailable:".yellow(), error);
            return;
        }

        let breakdown = &report.cost_breakdown;
        println!(
            "Collected {} billing records, total {}",
            report.billing_records,
            format!("${:.2}", breakdown.total_cost).bright_green().bold()
        );
        for service in breakdown.services.iter().take(TOP_SERVICES) {
            println!(
                "  • {:<40} {:>12} {:>7.2}%",
                service.name,
                format!("${:.2}", service.cost).green(),
                service.percentage
            );
        }
        if breakdown.services.len() > TOP_SERVICES {
            println!("  ... and {} more services", breakdown.services.len() - TOP_SERVICES);
        }

        if let Some(forecast) = &report.budget_forecast {
            println!(
                "\nForecast: {} over the next {} days ({} per day, {:?} confidence)",
                format!("${:.2}", forecast.forecasted_total).bright_green(),
                forecast.forecast_period_days,
                format!("${:.2}", forecast.historical_daily_average),
                forecast.confidence
            );
        }

        if !report.anomalies.is_empty() {
            println!("\n{}", "Cost anomalies:".yellow().bold());
            for anomaly in &report.anomalies {
                println!(
                    "  • {} ${:.2} ({:+.1}% vs ${:.2} average)",
                    anomaly.date, anomaly.cost, anomaly.deviation_percentage, anomaly.average_cost
                );
            }
        }
    }

    fn display_inventory(&self, report: &ScanReport) {
        self.section("Resources");
        println!("Found {} resources", report.total_resources.to_string().bold());
        for (resource_type, count) in &report.resources_by_type {
            println!("  • {}: {}", resource_type, count);
        }

        if report.idle_resources.is_empty() {
            println!("\n{}", "No idle resources detected".green());
            return;
        }

        println!("\n{}", "Idle resources:".yellow().bold());
        for flag in &report.idle_resources {
            let zone = flag
                .resource
                .metadata
                .get("zone")
                .map(|z| format!(" ({z})"))
                .unwrap_or_default();
            println!("  • {}{}", flag.resource.name.bright_white(), zone);
            println!("    Status: {}", flag.resource.state);
            println!("    {}", flag.reason);
        }
    }

    fn display_recommendations(&self, report: &ScanReport) {
        self.section("Cost Optimization Recommendations");

        if report.recommendations.is_empty() {
            println!(
                "{}",
                "No optimization opportunities found - resources are efficiently utilized".green()
            );
            return;
        }

        for (rank, rec) in report.recommendations.iter().enumerate() {
            println!(
                "{}. [{}] {} ({})",
                rank + 1,
                severity_label(rec.severity),
                rec.resource_name.bright_white().bold(),
                rec.resource_type
            );
            println!("   Recommendation: {}", rec.recommendation_text);
            println!("   Action: {}", rec.action_text);
            match rec.estimated_monthly_savings {
                Some(savings) => println!(
                    "   Estimated savings: {}",
                    format!("${:.2}/month", savings).bright_green()
                ),
                None => println!("   Estimated savings: {}", "unknown".dimmed()),
            }
            println!();
        }
    }

    fn display_summary(&self, report: &ScanReport) {
        self.section("Summary");
        let summary = &report.summary;
        println!("Recommendations: {}", summary.total_recommendations);
        for (severity, count) in summary.by_severity.iter().rev() {
            println!("  • {}: {}", severity_label(*severity), count);
        }
        if summary.with_savings_estimate > 0 {
            println!(
                "Estimated savings: {} monthly, {} annually ({} of {} recommendations priced)",
                format!("${:.2}", summary.total_monthly_savings).bright_green().bold(),
                format!("${:.2}", summary.total_annual_savings).bright_green(),
                summary.with_savings_estimate,
                summary.total_recommendations
            );
        }

        let efficiency = &report.efficiency;
        println!(
            "Utilization: {:.2}% ({} active / {} idle), grade {}",
            efficiency.utilization_rate,
            efficiency.active_resources,
            efficiency.idle_resources,
            efficiency.efficiency_grade.to_string().bold()
        );
        println!("{}", "=".repeat(WIDTH).bright_cyan());
    }

    fn header(&self, title: &str) {
        println!("\n{}", "=".repeat(WIDTH).bright_cyan());
        println!("  {}", title.bright_white().bold());
        println!("{}\n", "=".repeat(WIDTH).bright_cyan());
    }

    fn section(&self, title: &str) {
        println!("\n{}", "-".repeat(WIDTH).cyan());
        println!("  {}", title.bold());
        println!("{}\n", "-".repeat(WIDTH).cyan());
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.to_string();
    match severity {
        Severity::High => label.red().bold(),
        Severity::Medium => label.yellow().bold(),
        Severity::Low => label.blue(),
    }
}
