//! Google Cloud Platform Collector
//!
//! [`GcpCollector`] fulfills the [`Collector`] contract against the Cloud Billing API
//! (authentication smoke test), the Cloud Billing export (cost line items) and the
//! Cloud Asset inventory (resources).
//!
//! ## Behaviour
//!
//! - **Authentication**: validates the configuration, then calls
//!   `getBillingInfo` on the project. On success the client handle and billing info are
//!   cached for the lifetime of this collector instance; on failure nothing is cached.
//! - **Pagination**: every `collect_*` call drains all pages before returning.
//! - **Failure**: a failed page aborts the call with [`CollectorError::Collection`],
//!   carrying whatever had been gathered from earlier pages. Nothing is retried here.
//! - **Normalization**: see [`normalize`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cloud_cost_optimizer::collector::gcp::{CollectorConfig, GcpCollector, RestGcpApi};
//! use cloud_cost_optimizer::collector::Collector;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = RestGcpApi::new("ya29.token".to_string(), None)?;
//! let mut collector = GcpCollector::new(CollectorConfig {
//!     project_id: "my-project".to_string(),
//!     billing_account_id: String::new(),
//!     credential_handle: Arc::new(client),
//! });
//!
//! if collector.authenticate() {
//!     let resources = collector.collect_resource_data()?;
//!     println!("{} resources", resources.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod normalize;
pub mod rest;

pub use api::{
    Asset, AssetPage, AssetResource, BillingPage, BillingQuery, BillingRow, GcpApi,
    ProjectBillingInfo,
};
pub use rest::{BillingExport, RestGcpApi};

use super::{ensure_valid_range, Collector};
use crate::error::{ApiError, CollectorError, CollectorResult, PartialResults};
use crate::models::{BillingRecord, ResourceRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

const REQUIRED_FIELDS: &[&str] = &["project_id"];

/// Input to the GCP collector. Any other configuration is ignored.
#[derive(Clone)]
pub struct CollectorConfig {
    pub project_id: String,
    /// Optional; resolved from the project's billing info when empty.
    pub billing_account_id: String,
    pub credential_handle: Arc<dyn GcpApi>,
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("project_id", &self.project_id)
            .field("billing_account_id", &self.billing_account_id)
            .finish_non_exhaustive()
    }
}

struct Session {
    client: Arc<dyn GcpApi>,
    billing_info: ProjectBillingInfo,
}

pub struct GcpCollector {
    config: CollectorConfig,
    session: Option<Session>,
    last_error: Option<CollectorError>,
}

impl GcpCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            session: None,
            last_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Billing info fetched during authentication.
    pub fn billing_info(&self) -> Option<&ProjectBillingInfo> {
        self.session.as_ref().map(|s| &s.billing_info)
    }

    /// Configured billing account, falling back to the one linked to the project.
    pub fn billing_account_id(&self) -> Option<&str> {
        if !self.config.billing_account_id.is_empty() {
            return Some(&self.config.billing_account_id);
        }
        self.billing_info()
            .map(ProjectBillingInfo::billing_account_id)
            .filter(|id| !id.is_empty())
    }

    fn missing_config_field(&self) -> Option<&'static str> {
        if self.config.project_id.trim().is_empty() {
            return Some("project_id");
        }
        None
    }

    fn open_session(&self) -> CollectorResult<Session> {
        if let Some(field) = self.missing_config_field() {
            return Err(CollectorError::AuthenticationFailure {
                reason: format!("Missing required configuration field: {field}"),
            });
        }

        let client = Arc::clone(&self.config.credential_handle);
        let billing_info = client
            .get_project_billing_info(&self.config.project_id)
            .map_err(|e| CollectorError::AuthenticationFailure {
                reason: format!(
                    "Authentication test failed for project {}: {}",
                    self.config.project_id, e
                ),
            })?;

        if !billing_info.billing_enabled {
            warn!(
                project_id = %self.config.project_id,
                "Billing is not enabled for project, billing export may be empty"
            );
        }

        Ok(Session {
            client,
            billing_info,
        })
    }

    fn session(&self) -> CollectorResult<&Session> {
        self.session.as_ref().ok_or(CollectorError::NotAuthenticated)
    }
}

impl Collector for GcpCollector {
    fn authenticate(&mut self) -> bool {
        self.session = None;
        self.last_error = None;

        match self.open_session() {
            Ok(session) => {
                info!(
                    project_id = %self.config.project_id,
                    billing_account = %session.billing_info.billing_account_id(),
                    "Successfully authenticated"
                );
                self.session = Some(session);
                true
            }
            Err(e) => {
                error!(project_id = %self.config.project_id, error = %e, "Authentication failed");
                self.last_error = Some(e);
                false
            }
        }
    }

    fn last_error(&self) -> Option<&CollectorError> {
        self.last_error.as_ref()
    }

    fn collect_billing_data(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CollectorResult<Vec<BillingRecord>> {
        ensure_valid_range(start, end)?;
        let session = self.session()?;

        let span = info_span!("collect_billing_data", project_id = %self.config.project_id);
        let _enter = span.enter();

        let query = BillingQuery {
            project_id: self.config.project_id.clone(),
            billing_account_id: self.billing_account_id().unwrap_or_default().to_string(),
            start,
            end,
        };
        let project_id = &self.config.project_id;

        let records = drain_pages(PartialResults::Billing, |token| {
            let page = session.client.query_billing(&query, token)?;
            let records = page
                .rows
                .into_iter()
                .map(|row| normalize::billing_record_from_row(row, project_id))
                .filter(|record| record.is_within(start, end))
                .collect();
            Ok((records, page.next_page_token))
        })?;

        info!(records = records.len(), %start, %end, "Collected billing data");
        Ok(records)
    }

    fn collect_resource_data(&self) -> CollectorResult<Vec<ResourceRecord>> {
        let session = self.session()?;

        let span = info_span!("collect_resource_data", project_id = %self.config.project_id);
        let _enter = span.enter();

        let project_id = &self.config.project_id;
        let seen_at = Utc::now();

        let records = drain_pages(PartialResults::Resources, |token| {
            let page = session.client.list_assets(project_id, token)?;
            let records = page
                .assets
                .into_iter()
                .map(|asset| normalize::resource_from_asset(asset, project_id, seen_at))
                .collect();
            Ok((records, page.next_page_token))
        })?;

        let records = dedup_by_resource_id(records);
        info!(resources = records.len(), "Collected resource data");
        Ok(records)
    }

    fn required_config_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }
}

/// Fetch pages until the provider stops returning a page token.
fn drain_pages<T, F>(wrap: fn(Vec<T>) -> PartialResults, mut fetch: F) -> CollectorResult<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<(Vec<T>, Option<String>), ApiError>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut page = 0;

    loop {
        page += 1;
        match fetch(token.as_deref()) {
            Ok((batch, next)) => {
                debug!(page, items = batch.len(), "Fetched page");
                items.extend(batch);
                match next.filter(|t| !t.is_empty()) {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            Err(source) => {
                warn!(page, gathered = items.len(), error = %source, "Page fetch failed, aborting collection");
                return Err(CollectorError::Collection {
                    page,
                    partial: wrap(items),
                    source,
                });
            }
        }
    }

    Ok(items)
}

fn dedup_by_resource_id(records: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.resource_id.clone());
            if !fresh {
                warn!(resource_id = %record.resource_id, "Duplicate resource in listing, keeping first");
            }
            fresh
        })
        .collect()
}
