//! GCP → common model normalization
//!
//! Unsupported asset types become [`ResourceType::Other`] and unrecognized statuses
//! become [`ResourceState::Unknown`]; neither ever drops a record.

use super::api::{Asset, BillingRow};
use crate::models::{
    BillingRecord, ResourceRecord, ResourceState, ResourceType, METADATA_ATTACHED,
    METADATA_BILLING_NAME,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

pub const INSTANCE_ASSET_TYPE: &str = "compute.googleapis.com/Instance";
pub const DISK_ASSET_TYPE: &str = "compute.googleapis.com/Disk";

pub fn resource_type_for(asset_type: &str) -> ResourceType {
    match asset_type {
        INSTANCE_ASSET_TYPE => ResourceType::ComputeInstance,
        DISK_ASSET_TYPE => ResourceType::Disk,
        _ => ResourceType::Other,
    }
}

pub fn instance_state(status: Option<&str>) -> ResourceState {
    match status {
        Some("RUNNING") => ResourceState::Running,
        Some("STOPPED") => ResourceState::Stopped,
        Some("SUSPENDED") => ResourceState::Suspended,
        Some("TERMINATED") => ResourceState::Terminated,
        _ => ResourceState::Unknown,
    }
}

pub fn disk_state(status: Option<&str>) -> ResourceState {
    match status {
        Some("READY") => ResourceState::Running,
        _ => ResourceState::Unknown,
    }
}

/// Last path segment of a GCP resource URL (`.../zones/us-central1-a` → `us-central1-a`).
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

pub fn resource_from_asset(asset: Asset, project_id: &str, seen_at: DateTime<Utc>) -> ResourceRecord {
    let resource_type = resource_type_for(&asset.asset_type);
    let (data, location) = match asset.resource {
        Some(resource) => (resource.data, resource.location),
        None => (serde_json::Map::new(), None),
    };

    let status = data.get("status").and_then(Value::as_str);
    let state = match resource_type {
        ResourceType::ComputeInstance => instance_state(status),
        ResourceType::Disk => disk_state(status),
        ResourceType::Other => ResourceState::Unknown,
    };

    let name = data
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| short_name(&asset.name).to_string());

    let mut metadata = scalar_attributes(&data);
    metadata.insert("asset_type".to_string(), asset.asset_type.clone());
    if let Some(location) = location {
        metadata.insert("location".to_string(), location);
    }
    if let Some(zone) = data.get("zone").and_then(Value::as_str) {
        metadata.insert("zone".to_string(), short_name(zone).to_string());
    }
    if let Some(machine_type) = data.get("machineType").and_then(Value::as_str) {
        metadata.insert("machine_type".to_string(), short_name(machine_type).to_string());
    }
    if resource_type == ResourceType::Disk {
        let attached = data
            .get("users")
            .and_then(Value::as_array)
            .map(|users| !users.is_empty())
            .unwrap_or(false);
        metadata.insert(METADATA_ATTACHED.to_string(), attached.to_string());
    }
    // The billing export names resources by numeric id rather than by asset name.
    if let Some(id) = data.get("id").and_then(scalar_to_string) {
        if let Some(prefix) = asset.name.rsplit_once('/').map(|(prefix, _)| prefix) {
            metadata.insert(METADATA_BILLING_NAME.to_string(), format!("{prefix}/{id}"));
        }
    }

    ResourceRecord {
        resource_id: asset.name,
        resource_type,
        name,
        project_id: project_id.to_string(),
        state,
        metadata,
        last_seen_timestamp: seen_at,
    }
}

pub fn billing_record_from_row(row: BillingRow, default_project: &str) -> BillingRecord {
    BillingRecord {
        service_name: row.service_description,
        sku_description: row.sku_description,
        usage_start: row.usage_start_time,
        usage_end: row.usage_end_time,
        cost_amount: row.cost,
        currency: row.currency,
        project_id: row
            .project_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| default_project.to_string()),
        resource_id: row.resource_name.filter(|name| !name.is_empty()),
    }
}

fn scalar_attributes(data: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    data.iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::gcp::api::AssetResource;
    use serde_json::json;

    fn asset(asset_type: &str, name: &str, data: Value) -> Asset {
        Asset {
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            resource: Some(AssetResource {
                data: data.as_object().cloned().unwrap_or_default(),
                location: Some("us-central1-a".to_string()),
            }),
        }
    }

    #[test]
    fn test_instance_normalization() {
        let record = resource_from_asset(
            asset(
                INSTANCE_ASSET_TYPE,
                "//compute.googleapis.com/projects/demo/zones/us-central1-a/instances/web-1",
                json!({
                    "id": "8812345",
                    "name": "web-1",
                    "status": "STOPPED",
                    "zone": "https://www.googleapis.com/compute/v1/projects/demo/zones/us-central1-a",
                    "machineType": "https://www.googleapis.com/compute/v1/projects/demo/zones/us-central1-a/machineTypes/e2-medium",
                    "disks": [{"source": "boot"}]
                }),
            ),
            "demo",
            Utc::now(),
        );

        assert_eq!(record.resource_type, ResourceType::ComputeInstance);
        assert_eq!(record.state, ResourceState::Stopped);
        assert_eq!(record.name, "web-1");
        assert_eq!(record.metadata["zone"], "us-central1-a");
        assert_eq!(record.metadata["machine_type"], "e2-medium");
        assert_eq!(record.metadata["location"], "us-central1-a");
        assert_eq!(
            record.metadata[METADATA_BILLING_NAME],
            "//compute.googleapis.com/projects/demo/zones/us-central1-a/instances/8812345"
        );
        assert!(!record.metadata.contains_key("disks"));
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        for status in ["PROVISIONING", "STAGING", "REPAIRING", ""] {
            let record = resource_from_asset(
                asset(INSTANCE_ASSET_TYPE, "//x/instances/a", json!({ "status": status })),
                "demo",
                Utc::now(),
            );
            assert_eq!(record.state, ResourceState::Unknown, "status {status:?}");
        }

        let no_data = Asset {
            name: "//x/instances/b".to_string(),
            asset_type: INSTANCE_ASSET_TYPE.to_string(),
            resource: None,
        };
        let record = resource_from_asset(no_data, "demo", Utc::now());
        assert_eq!(record.state, ResourceState::Unknown);
        assert_eq!(record.name, "b");
    }

    #[test]
    fn test_disk_attachment() {
        let detached = resource_from_asset(
            asset(DISK_ASSET_TYPE, "//x/disks/d1", json!({"status": "READY", "sizeGb": "100"})),
            "demo",
            Utc::now(),
        );
        assert_eq!(detached.resource_type, ResourceType::Disk);
        assert_eq!(detached.state, ResourceState::Running);
        assert_eq!(detached.is_attached(), Some(false));
        assert_eq!(detached.metadata["sizeGb"], "100");

        let attached = resource_from_asset(
            asset(DISK_ASSET_TYPE, "//x/disks/d2", json!({"status": "READY", "users": ["//x/instances/a"]})),
            "demo",
            Utc::now(),
        );
        assert_eq!(attached.is_attached(), Some(true));
    }

    #[test]
    fn test_unsupported_type_is_other() {
        let record = resource_from_asset(
            asset("storage.googleapis.com/Bucket", "//storage.googleapis.com/logs", json!({})),
            "demo",
            Utc::now(),
        );
        assert_eq!(record.resource_type, ResourceType::Other);
        assert_eq!(record.state, ResourceState::Unknown);
        assert_eq!(record.metadata["asset_type"], "storage.googleapis.com/Bucket");
    }

    #[test]
    fn test_billing_row_defaults_project() {
        let now = Utc::now();
        let row = BillingRow {
            service_description: "Compute Engine".to_string(),
            sku_description: "Storage PD Capacity".to_string(),
            usage_start_time: now,
            usage_end_time: now,
            cost: 1.5,
            currency: "USD".to_string(),
            project_id: None,
            resource_name: Some(String::new()),
        };
        let record = billing_record_from_row(row, "demo");
        assert_eq!(record.project_id, "demo");
        assert_eq!(record.service_name, "Compute Engine");
        assert!(record.resource_id.is_none());
    }
}
