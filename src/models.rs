//! Core Data Models
//!
//! This module defines the common data model shared by every collector, the idle
//! detector and the recommendation engine. Provider collectors normalize their native
//! API shapes into these types; nothing downstream of a collector ever sees a
//! provider-specific type.
//!
//! ## Data Flow
//!
//! 1. **Billing**: [`BillingRecord`] - One cost line item from the provider's billing data
//! 2. **Inventory**: [`ResourceRecord`] - Point-in-time snapshot of one provisioned resource
//! 3. **Output**: [`Recommendation`] - Actionable suggestion derived from an idle resource
//!
//! ## Core Types
//!
//! - [`ResourceType`] - Normalized resource kind (`Other` for anything unsupported)
//! - [`ResourceState`] - Normalized lifecycle state (`Unknown` for unrecognized states)
//! - [`Severity`] - Recommendation priority, ordered `Low < Medium < High`
//!
//! ## Features
//!
//! - **Serde Integration**: All public types support serialization/deserialization
//! - **Optional Fields**: Savings estimates are absent rather than guessed
//! - **Opaque Metadata**: Provider attributes survive normalization as string pairs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key carrying a disk's attachment status (`"true"` / `"false"`).
pub const METADATA_ATTACHED: &str = "attached";

/// Metadata key carrying the name the billing export uses for this resource, when it
/// differs from `resource_id`.
pub const METADATA_BILLING_NAME: &str = "billing_resource_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub service_name: String,
    pub sku_description: String,
    pub usage_start: DateTime<Utc>,
    pub usage_end: DateTime<Utc>,
    pub cost_amount: f64,
    pub currency: String,
    pub project_id: String,
    /// Resource the cost is attributed to, when the billing export carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl BillingRecord {
    /// True when the usage window lies entirely inside `[start, end]`.
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.usage_start >= start && self.usage_end <= end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    ComputeInstance,
    Disk,
    Other,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::Disk => "disk",
            ResourceType::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceState {
    Running,
    Stopped,
    Suspended,
    Terminated,
    Unknown,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceState::Running => "RUNNING",
            ResourceState::Stopped => "STOPPED",
            ResourceState::Suspended => "SUSPENDED",
            ResourceState::Terminated => "TERMINATED",
            ResourceState::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub name: String,
    pub project_id: String,
    pub state: ResourceState,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub last_seen_timestamp: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        name: impl Into<String>,
        project_id: impl Into<String>,
        state: ResourceState,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type,
            name: name.into(),
            project_id: project_id.into(),
            state,
            metadata: BTreeMap::new(),
            last_seen_timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `Some(false)` only when the provider explicitly reported the disk as detached.
    pub fn is_attached(&self) -> Option<bool> {
        match self.metadata.get(METADATA_ATTACHED).map(String::as_str) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    /// Whether a billing line attributed to `billed_id` belongs to this resource.
    pub fn matches_billing(&self, billed_id: &str) -> bool {
        self.resource_id == billed_id
            || self.metadata.get(METADATA_BILLING_NAME).map(String::as_str) == Some(billed_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub recommendation_text: String,
    pub action_text: String,
    pub severity: Severity,
    /// Absent when no billing data could be attributed to the resource.
    pub estimated_monthly_savings: Option<f64>,
}
