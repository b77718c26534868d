//! Collector Abstraction
//!
//! A [`Collector`] is the capability set every cloud provider integration must expose:
//! authenticate, collect billing records for a time window, and enumerate resources.
//! Each implementation owns its own authentication state; adding a provider means adding
//! a new type implementing this trait, with no change to detection or recommendation code.
//!
//! ## Contract
//!
//! - [`Collector::authenticate`] returns `false` instead of failing, and keeps the reason
//!   available through [`Collector::last_error`]
//! - `collect_*` calls block until every page is drained and return concrete `Vec`s
//! - `collect_*` calls made before a successful authentication fail fast with
//!   [`CollectorError::NotAuthenticated`]

pub mod gcp;

use crate::error::{CollectorError, CollectorResult};
use crate::models::{BillingRecord, ResourceRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub trait Collector {
    /// Establish a provider session, caching the client on success.
    fn authenticate(&mut self) -> bool;

    /// Why the last `authenticate` call failed, if it did.
    fn last_error(&self) -> Option<&CollectorError>;

    /// Billing records with `usage_start >= start` and `usage_end <= end`.
    fn collect_billing_data(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CollectorResult<Vec<BillingRecord>>;

    /// Every resource visible to the authenticated identity, in provider order.
    fn collect_resource_data(&self) -> CollectorResult<Vec<ResourceRecord>>;

    /// Configuration fields that must be present for `authenticate` to succeed.
    fn required_config_fields(&self) -> &'static [&'static str];

    /// Total cost per service over the window.
    fn cost_by_service(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CollectorResult<BTreeMap<String, f64>> {
        let records = self.collect_billing_data(start, end)?;
        let mut totals = BTreeMap::new();
        for record in &records {
            *totals.entry(record.service_name.clone()).or_insert(0.0) += record.cost_amount;
        }
        Ok(totals)
    }
}

/// Fails with `InvalidRange` when `start > end`. Collectors call this before any API work.
pub fn ensure_valid_range(start: DateTime<Utc>, end: DateTime<Utc>) -> CollectorResult<()> {
    if start > end {
        return Err(CollectorError::InvalidRange { start, end });
    }
    Ok(())
}
