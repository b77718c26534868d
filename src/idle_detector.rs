//! Idle Resource Detection
//!
//! Flags resources that are candidates for cost reduction using a fixed rule table.
//! Detection is a pure function of its input: the same records always produce the same
//! flags, in input order.
//!
//! ## Rules
//!
//! Evaluated per resource, first match wins:
//!
//! | resource type      | condition               | reason                          |
//! |--------------------|-------------------------|---------------------------------|
//! | any                | state is `Unknown`      | never flagged                   |
//! | `ComputeInstance`  | `Stopped`               | [`IdleReason::InstanceStopped`]    |
//! | `ComputeInstance`  | `Suspended`             | [`IdleReason::InstanceSuspended`]  |
//! | `ComputeInstance`  | `Terminated`            | [`IdleReason::InstanceTerminated`] |
//! | `Disk`             | `attached == "false"`   | [`IdleReason::UnattachedDisk`]     |
//!
//! Only depends on [`crate::models`].

use crate::models::{ResourceRecord, ResourceState, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleReason {
    InstanceStopped,
    InstanceSuspended,
    InstanceTerminated,
    UnattachedDisk,
}

impl IdleReason {
    pub fn message(&self) -> &'static str {
        match self {
            IdleReason::InstanceStopped => {
                "Instance is stopped — consider deletion if no longer needed"
            }
            IdleReason::InstanceSuspended => {
                "Instance is suspended — consider deletion if no longer needed"
            }
            IdleReason::InstanceTerminated => {
                "Instance is terminated but still billed for attached resources — review"
            }
            IdleReason::UnattachedDisk => "Unattached disk — consider deletion",
        }
    }
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A resource matched by one of the idle rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleFlag {
    pub resource: ResourceRecord,
    pub reason: IdleReason,
}

/// The rule that matches `resource`, if any.
pub fn classify(resource: &ResourceRecord) -> Option<IdleReason> {
    // Unknown state is never flagged.
    if resource.state == ResourceState::Unknown {
        return None;
    }

    match (resource.resource_type, resource.state) {
        (ResourceType::ComputeInstance, ResourceState::Stopped) => Some(IdleReason::InstanceStopped),
        (ResourceType::ComputeInstance, ResourceState::Suspended) => {
            Some(IdleReason::InstanceSuspended)
        }
        (ResourceType::ComputeInstance, ResourceState::Terminated) => {
            Some(IdleReason::InstanceTerminated)
        }
        (ResourceType::Disk, _) if resource.is_attached() == Some(false) => {
            Some(IdleReason::UnattachedDisk)
        }
        _ => None,
    }
}

pub fn detect_idle_resources(resources: &[ResourceRecord]) -> Vec<IdleFlag> {
    resources
        .iter()
        .filter_map(|resource| {
            classify(resource).map(|reason| IdleFlag {
                resource: resource.clone(),
                reason,
            })
        })
        .collect()
}
