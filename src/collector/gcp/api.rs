//! Native GCP API surface
//!
//! [`GcpApi`] is the authenticated client handle a credential provider hands to the
//! [`GcpCollector`](super::GcpCollector). It speaks in GCP's own shapes, one page at a
//! time; pagination and normalization belong to the collector.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `cloudbilling.projects.getBillingInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectBillingInfo {
    pub name: String,
    pub project_id: String,
    pub billing_account_name: String,
    pub billing_enabled: bool,
}

impl ProjectBillingInfo {
    /// Billing account id without the `billingAccounts/` prefix.
    pub fn billing_account_id(&self) -> &str {
        self.billing_account_name
            .strip_prefix("billingAccounts/")
            .unwrap_or(&self.billing_account_name)
    }
}

/// One entry of `cloudasset.assets.list` with `contentType=RESOURCE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
    pub asset_type: String,
    #[serde(default)]
    pub resource: Option<AssetResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResource {
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPage {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One line item of the Cloud Billing export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRow {
    pub service_description: String,
    pub sku_description: String,
    pub usage_start_time: DateTime<Utc>,
    pub usage_end_time: DateTime<Utc>,
    pub cost: f64,
    pub currency: String,
    pub project_id: Option<String>,
    /// `resource.global_name`, only present in the resource-level export.
    pub resource_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingPage {
    pub rows: Vec<BillingRow>,
    pub next_page_token: Option<String>,
}

/// Scope of a billing export query.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingQuery {
    pub project_id: String,
    pub billing_account_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub trait GcpApi: Send + Sync {
    fn get_project_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError>;

    fn list_assets(&self, project_id: &str, page_token: Option<&str>)
        -> Result<AssetPage, ApiError>;

    fn query_billing(
        &self,
        query: &BillingQuery,
        page_token: Option<&str>,
    ) -> Result<BillingPage, ApiError>;
}
