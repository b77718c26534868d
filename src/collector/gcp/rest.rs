//! Blocking REST client for the GCP APIs the collector needs
//!
//! - Cloud Billing `v1/projects/{project}/billingInfo`
//! - Cloud Asset `v1/projects/{project}/assets` (`contentType=RESOURCE`)
//! - BigQuery `jobs.query` / `jobs.getQueryResults` over the Cloud Billing export table
//!
//! Without a configured [`BillingExport`] billing queries return a single empty page.
//! Billing export pages are addressed by a BigQuery job; the page token handed back to
//! the collector packs the job id, its location and BigQuery's own page token.

use super::api::{AssetPage, BillingPage, BillingQuery, BillingRow, GcpApi, ProjectBillingInfo};
use crate::error::ApiError;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

const CLOUD_BILLING_URL: &str = "https://cloudbilling.googleapis.com";
const CLOUD_ASSET_URL: &str = "https://cloudasset.googleapis.com";
const BIGQUERY_URL: &str = "https://bigquery.googleapis.com";

const ASSET_PAGE_SIZE: u32 = 1000;
const BILLING_PAGE_SIZE: u32 = 1000;
const QUERY_POLL_TIMEOUT_MS: u32 = 10_000;
const MAX_QUERY_POLLS: usize = 30;

/// Location of the Cloud Billing export in BigQuery.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingExport {
    /// Fully qualified table, `project.dataset.table`
    pub table: String,
    /// Whether this is the resource-level (detailed) export carrying `resource.global_name`
    pub resource_level: bool,
}

pub struct RestGcpApi {
    client: Client,
    access_token: String,
    billing_export: Option<BillingExport>,
    billing_url: String,
    asset_url: String,
    bigquery_url: String,
}

impl RestGcpApi {
    pub fn new(access_token: String, billing_export: Option<BillingExport>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("cloud-cost-optimizer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            access_token,
            billing_export,
            billing_url: CLOUD_BILLING_URL.to_string(),
            asset_url: CLOUD_ASSET_URL.to_string(),
            bigquery_url: BIGQUERY_URL.to_string(),
        })
    }

    /// Point every API at one base URL (emulators, recording proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        self.billing_url = base.clone();
        self.asset_url = base.clone();
        self.bigquery_url = base;
        self
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::status(status.as_u16(), error_message(&body)));
        }
        response
            .json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn billing_sql(export: &BillingExport) -> String {
        let resource_column = if export.resource_level {
            "resource.global_name"
        } else {
            "CAST(NULL AS STRING)"
        };
        format!(
            "SELECT service.description, sku.description, usage_start_time, usage_end_time, \
             cost, currency, project.id, {resource_column} \
             FROM `{table}` \
             WHERE usage_start_time >= @start AND usage_end_time <= @end \
             AND project.id = @project AND (@billing_account = '' OR billing_account_id = @billing_account) \
             ORDER BY usage_start_time",
            table = export.table,
        )
    }

    fn start_query(&self, export: &BillingExport, query: &BillingQuery) -> Result<QueryResponse, ApiError> {
        let url = format!("{}/bigquery/v2/projects/{}/queries", self.bigquery_url, query.project_id);
        let body = json!({
            "query": Self::billing_sql(export),
            "useLegacySql": false,
            "maxResults": BILLING_PAGE_SIZE,
            "timeoutMs": QUERY_POLL_TIMEOUT_MS,
            "parameterMode": "NAMED",
            "queryParameters": [
                timestamp_param("start", query.start),
                timestamp_param("end", query.end),
                string_param("project", &query.project_id),
                string_param("billing_account", &query.billing_account_id),
            ],
        });
        debug!(table = %export.table, "Starting billing export query");
        self.send(self.client.post(url).json(&body))
    }

    fn query_results(
        &self,
        project_id: &str,
        cursor: &QueryCursor,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, ApiError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries/{}",
            self.bigquery_url, project_id, cursor.job_id
        );
        let mut params = vec![
            ("maxResults", BILLING_PAGE_SIZE.to_string()),
            ("timeoutMs", QUERY_POLL_TIMEOUT_MS.to_string()),
        ];
        if !cursor.location.is_empty() {
            params.push(("location", cursor.location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.send(self.client.get(url).query(&params))
    }
}

impl GcpApi for RestGcpApi {
    fn get_project_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError> {
        let url = format!("{}/v1/projects/{}/billingInfo", self.billing_url, project_id);
        self.send(self.client.get(url))
    }

    fn list_assets(&self, project_id: &str, page_token: Option<&str>) -> Result<AssetPage, ApiError> {
        let url = format!("{}/v1/projects/{}/assets", self.asset_url, project_id);
        let mut params = vec![
            ("contentType", "RESOURCE".to_string()),
            ("pageSize", ASSET_PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.send(self.client.get(url).query(&params))
    }

    fn query_billing(&self, query: &BillingQuery, page_token: Option<&str>) -> Result<BillingPage, ApiError> {
        let Some(export) = self.billing_export.as_ref() else {
            warn!(project_id = %query.project_id, "No billing export table configured, skipping billing collection");
            return Ok(BillingPage::default());
        };

        let (mut response, cursor) = match page_token {
            None => {
                let response = self.start_query(export, query)?;
                let cursor = QueryCursor::from_job(&response)?;
                (response, cursor)
            }
            Some(token) => {
                let cursor = QueryCursor::decode(token)?;
                let response = self.query_results(&query.project_id, &cursor, Some(cursor.page_token.as_str()))?;
                (response, cursor)
            }
        };

        let mut polls = 0;
        while !response.job_complete {
            polls += 1;
            if polls > MAX_QUERY_POLLS {
                return Err(ApiError::Decode(format!(
                    "billing query {} did not complete",
                    cursor.job_id
                )));
            }
            debug!(job_id = %cursor.job_id, polls, "Waiting for billing query");
            response = self.query_results(&query.project_id, &cursor, None)?;
        }

        let rows = response
            .rows
            .iter()
            .map(decode_billing_row)
            .collect::<Result<Vec<_>, _>>()?;

        let next_page_token = response
            .page_token
            .filter(|t| !t.is_empty())
            .map(|t| cursor.with_page_token(t).encode());

        Ok(BillingPage { rows, next_page_token })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QueryResponse {
    job_reference: Option<JobReference>,
    job_complete: bool,
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Value,
}

#[derive(Debug, Clone, PartialEq)]
struct QueryCursor {
    job_id: String,
    location: String,
    page_token: String,
}

impl QueryCursor {
    fn from_job(response: &QueryResponse) -> Result<Self, ApiError> {
        let job = response
            .job_reference
            .as_ref()
            .ok_or_else(|| ApiError::Decode("query response has no jobReference".to_string()))?;
        Ok(Self {
            job_id: job.job_id.clone(),
            location: job.location.clone().unwrap_or_default(),
            page_token: String::new(),
        })
    }

    fn with_page_token(&self, page_token: String) -> Self {
        Self {
            page_token,
            ..self.clone()
        }
    }

    fn encode(&self) -> String {
        format!("{}|{}|{}", self.job_id, self.location, self.page_token)
    }

    fn decode(token: &str) -> Result<Self, ApiError> {
        let mut parts = token.splitn(3, '|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(job_id), Some(location), Some(page_token)) if !job_id.is_empty() => Ok(Self {
                job_id: job_id.to_string(),
                location: location.to_string(),
                page_token: page_token.to_string(),
            }),
            _ => Err(ApiError::Decode(format!("malformed billing page token: {token}"))),
        }
    }
}

fn timestamp_param(name: &str, value: DateTime<Utc>) -> Value {
    json!({
        "name": name,
        "parameterType": {"type": "TIMESTAMP"},
        "parameterValue": {"value": value.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string()},
    })
}

fn string_param(name: &str, value: &str) -> Value {
    json!({
        "name": name,
        "parameterType": {"type": "STRING"},
        "parameterValue": {"value": value},
    })
}

/// Extract `error.message` from a Google API error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn decode_billing_row(row: &TableRow) -> Result<BillingRow, ApiError> {
    if row.f.len() < 8 {
        return Err(ApiError::Decode(format!(
            "billing row has {} columns, expected 8",
            row.f.len()
        )));
    }
    let cost = finite_number(required(row, 4, "cost")?, "cost")?;

    Ok(BillingRow {
        service_description: required(row, 0, "service.description")?.to_string(),
        sku_description: cell(row, 1).unwrap_or_default().to_string(),
        usage_start_time: bigquery_timestamp(required(row, 2, "usage_start_time")?)?,
        usage_end_time: bigquery_timestamp(required(row, 3, "usage_end_time")?)?,
        cost,
        currency: cell(row, 5).unwrap_or("USD").to_string(),
        project_id: cell(row, 6).map(str::to_string),
        resource_name: cell(row, 7).map(str::to_string),
    })
}

fn cell(row: &TableRow, index: usize) -> Option<&str> {
    row.f.get(index).and_then(|c| c.v.as_str())
}

fn required<'a>(row: &'a TableRow, index: usize, column: &str) -> Result<&'a str, ApiError> {
    cell(row, index).ok_or_else(|| ApiError::Decode(format!("billing row is missing {column}")))
}

/// Numeric cell value. `NaN` and infinities parse as `f64` but are never valid here.
fn finite_number(raw: &str, column: &str) -> Result<f64, ApiError> {
    let value = raw
        .parse::<f64>()
        .map_err(|e| ApiError::Decode(format!("invalid {column} {raw:?}: {e}")))?;
    if !value.is_finite() {
        return Err(ApiError::Decode(format!("non-finite {column} {raw:?}")));
    }
    Ok(value)
}

/// BigQuery returns TIMESTAMP cells as floating-point epoch seconds (`"1.7092512E9"`).
fn bigquery_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let seconds = finite_number(raw, "timestamp")?;
    let micros = (seconds * 1_000_000.0).round() as i64;
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(micros.div_euclid(1_000_000), nanos)
        .single()
        .ok_or_else(|| ApiError::Decode(format!("timestamp out of range: {raw}")))
}
