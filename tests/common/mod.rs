#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use cloud_cost_optimizer::collector::gcp::{
    Asset, AssetPage, AssetResource, BillingPage, BillingQuery, BillingRow, CollectorConfig,
    GcpApi, GcpCollector, ProjectBillingInfo,
};
use cloud_cost_optimizer::ApiError;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PROJECT: &str = "demo-project";

/// In-memory `GcpApi` serving pre-built pages addressed by `page-N` tokens.
#[derive(Default)]
pub struct FakeGcpApi {
    pub billing_info: Option<ProjectBillingInfo>,
    asset_pages: Vec<Vec<Asset>>,
    billing_pages: Vec<Vec<BillingRow>>,
    fail_asset_page: Mutex<Option<usize>>,
    fail_billing_page: Mutex<Option<usize>>,
    pub billing_info_calls: AtomicUsize,
    pub asset_calls: AtomicUsize,
    pub billing_calls: AtomicUsize,
    pub asset_tokens: Mutex<Vec<Option<String>>>,
    pub billing_tokens: Mutex<Vec<Option<String>>>,
    pub queries: Mutex<Vec<BillingQuery>>,
}

impl FakeGcpApi {
    pub fn new() -> Self {
        Self {
            billing_info: Some(ProjectBillingInfo {
                name: format!("projects/{PROJECT}/billingInfo"),
                project_id: PROJECT.to_string(),
                billing_account_name: "billingAccounts/0123-4567-89AB".to_string(),
                billing_enabled: true,
            }),
            ..Self::default()
        }
    }

    /// Authentication smoke test fails with 403.
    pub fn denied() -> Self {
        Self {
            billing_info: None,
            ..Self::default()
        }
    }

    pub fn with_asset_pages(mut self, pages: Vec<Vec<Asset>>) -> Self {
        self.asset_pages = pages;
        self
    }

    pub fn with_billing_pages(mut self, pages: Vec<Vec<BillingRow>>) -> Self {
        self.billing_pages = pages;
        self
    }

    /// Make the given 1-based asset page fail with a 503.
    pub fn failing_asset_page(self, page: usize) -> Self {
        *self.fail_asset_page.lock().unwrap() = Some(page);
        self
    }

    pub fn failing_billing_page(self, page: usize) -> Self {
        *self.fail_billing_page.lock().unwrap() = Some(page);
        self
    }

    pub fn clear_failures(&self) {
        *self.fail_asset_page.lock().unwrap() = None;
        *self.fail_billing_page.lock().unwrap() = None;
    }

    pub fn total_calls(&self) -> usize {
        self.billing_info_calls.load(Ordering::SeqCst)
            + self.asset_calls.load(Ordering::SeqCst)
            + self.billing_calls.load(Ordering::SeqCst)
    }
}

fn page_index(token: Option<&str>) -> Result<usize, ApiError> {
    match token {
        None => Ok(0),
        Some(token) => token
            .strip_prefix("page-")
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| n - 1)
            .ok_or_else(|| ApiError::status(400, format!("bad page token {token}"))),
    }
}

fn next_token(index: usize, total: usize) -> Option<String> {
    (index + 1 < total).then(|| format!("page-{}", index + 2))
}

fn serve<T: Clone>(
    pages: &[Vec<T>],
    token: Option<&str>,
    fail: &Mutex<Option<usize>>,
) -> Result<(Vec<T>, Option<String>), ApiError> {
    let index = page_index(token)?;
    if *fail.lock().unwrap() == Some(index + 1) {
        return Err(ApiError::status(503, "Service temporarily unavailable"));
    }
    let items = pages.get(index).cloned().unwrap_or_default();
    Ok((items, next_token(index, pages.len())))
}

impl GcpApi for FakeGcpApi {
    fn get_project_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError> {
        self.billing_info_calls.fetch_add(1, Ordering::SeqCst);
        match &self.billing_info {
            Some(info) if info.project_id == project_id => Ok(info.clone()),
            Some(_) => Err(ApiError::status(404, format!("Project {project_id} not found"))),
            None => Err(ApiError::status(
                403,
                "The caller does not have permission",
            )),
        }
    }

    fn list_assets(&self, _project_id: &str, page_token: Option<&str>) -> Result<AssetPage, ApiError> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        self.asset_tokens
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));
        let (assets, next_page_token) = serve(&self.asset_pages, page_token, &self.fail_asset_page)?;
        Ok(AssetPage {
            assets,
            next_page_token,
        })
    }

    fn query_billing(
        &self,
        query: &BillingQuery,
        page_token: Option<&str>,
    ) -> Result<BillingPage, ApiError> {
        self.billing_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        self.billing_tokens
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));
        let (rows, next_page_token) =
            serve(&self.billing_pages, page_token, &self.fail_billing_page)?;
        Ok(BillingPage {
            rows,
            next_page_token,
        })
    }
}

pub fn collector_with(api: Arc<FakeGcpApi>) -> GcpCollector {
    GcpCollector::new(CollectorConfig {
        project_id: PROJECT.to_string(),
        billing_account_id: String::new(),
        credential_handle: api,
    })
}

pub fn instance_asset(name: &str, status: &str) -> Asset {
    Asset {
        name: format!("//compute.googleapis.com/projects/{PROJECT}/zones/us-central1-a/instances/{name}"),
        asset_type: "compute.googleapis.com/Instance".to_string(),
        resource: Some(AssetResource {
            data: json!({
                "name": name,
                "status": status,
                "zone": format!("https://www.googleapis.com/compute/v1/projects/{PROJECT}/zones/us-central1-a"),
                "machineType": format!("https://www.googleapis.com/compute/v1/projects/{PROJECT}/zones/us-central1-a/machineTypes/e2-medium"),
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
            location: Some("us-central1-a".to_string()),
        }),
    }
}

pub fn disk_asset(name: &str, attached_to: Option<&str>) -> Asset {
    let users: Vec<String> = attached_to.into_iter().map(str::to_string).collect();
    Asset {
        name: format!("//compute.googleapis.com/projects/{PROJECT}/zones/us-central1-a/disks/{name}"),
        asset_type: "compute.googleapis.com/Disk".to_string(),
        resource: Some(AssetResource {
            data: json!({
                "name": name,
                "status": "READY",
                "sizeGb": "100",
                "users": users,
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
            location: Some("us-central1-a".to_string()),
        }),
    }
}

pub fn bucket_asset(name: &str) -> Asset {
    Asset {
        name: format!("//storage.googleapis.com/{name}"),
        asset_type: "storage.googleapis.com/Bucket".to_string(),
        resource: Some(AssetResource {
            data: json!({ "name": name }).as_object().cloned().unwrap_or_default(),
            location: Some("us".to_string()),
        }),
    }
}

pub fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, n, 0, 0, 0).unwrap()
}

pub fn billing_row(service: &str, start: DateTime<Utc>, cost: f64, resource: Option<&str>) -> BillingRow {
    BillingRow {
        service_description: service.to_string(),
        sku_description: format!("{service} usage"),
        usage_start_time: start,
        usage_end_time: start + Duration::days(1),
        cost,
        currency: "USD".to_string(),
        project_id: Some(PROJECT.to_string()),
        resource_name: resource.map(str::to_string),
    }
}
