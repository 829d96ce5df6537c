//! Job dispatch payload construction
//!
//! Jobs run out-of-process and cannot call back into the core, so the
//! full contract travels in the job environment: target identity, backup
//! location, and desired server configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::job_runner::{JobSpec, ResourceLimits};
use crate::state_machine::WorkflowKind;
use hearth_storage::TargetId;

/// Static platform configuration handed to every dispatched job
///
/// These are the settings owned by the surrounding platform (backup
/// bucket, network identity), not by individual trigger requests.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Bucket holding world-data backup artifacts
    pub backup_bucket: String,

    /// Instance size used when the trigger input does not override it
    pub default_instance_type: String,

    /// Public DNS name the provisioned server should answer on
    pub server_fqdn: Option<String>,

    /// Pre-existing SSH key pair name for operator access
    pub ssh_key_pair: Option<String>,
}

impl PlatformConfig {
    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.backup_bucket.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "backup_bucket cannot be empty".to_string(),
            ));
        }
        if self.default_instance_type.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "default_instance_type cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trigger input for a provision workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionInput {
    /// Server software version to deploy (runner default when absent)
    pub version: Option<String>,

    /// Instance size override
    pub instance_type: Option<String>,

    /// Reference to a specific backup artifact to restore from; the job
    /// restores the most recent snapshot when absent
    pub restore_from: Option<String>,
}

/// Trigger input for a deprovision workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeprovisionInput {}

/// Build the job spec for one workflow kind from the stored trigger input
///
/// Input parsing happens here, at dispatch time: a malformed payload is a
/// dispatch failure, finalizing the execution FAILED.
pub fn job_spec_for(
    kind: WorkflowKind,
    target_id: &TargetId,
    platform: &PlatformConfig,
    input: &serde_json::Value,
) -> crate::Result<JobSpec> {
    match kind {
        WorkflowKind::Provision => {
            let input: ProvisionInput = serde_json::from_value(input.clone())
                .map_err(|e| crate::Error::InvalidInput(format!("provision input: {}", e)))?;
            Ok(provision_job_spec(target_id, platform, &input))
        }
        WorkflowKind::Deprovision => {
            let _input: DeprovisionInput = serde_json::from_value(input.clone())
                .map_err(|e| crate::Error::InvalidInput(format!("deprovision input: {}", e)))?;
            Ok(deprovision_job_spec(target_id, platform))
        }
    }
}

/// Job spec for bringing a server up
///
/// The job restores world data from the backup bucket before the server
/// becomes reachable.
pub fn provision_job_spec(
    target_id: &TargetId,
    platform: &PlatformConfig,
    input: &ProvisionInput,
) -> JobSpec {
    let mut environment = base_environment(target_id, platform);

    let instance_type = input
        .instance_type
        .clone()
        .unwrap_or_else(|| platform.default_instance_type.clone());
    environment.insert("HEARTH_INSTANCE_TYPE".to_string(), instance_type);

    if let Some(version) = &input.version {
        environment.insert("HEARTH_SERVER_VERSION".to_string(), version.clone());
    }
    if let Some(restore_from) = &input.restore_from {
        environment.insert("HEARTH_RESTORE_FROM_BACKUP".to_string(), restore_from.clone());
    }
    if let Some(fqdn) = &platform.server_fqdn {
        environment.insert("HEARTH_SERVER_FQDN".to_string(), fqdn.clone());
    }
    if let Some(key_pair) = &platform.ssh_key_pair {
        environment.insert("HEARTH_SSH_KEY_PAIR".to_string(), key_pair.clone());
    }

    JobSpec {
        command: deployer_command("up"),
        environment,
        resource_limits: ResourceLimits::default(),
    }
}

/// Job spec for tearing a server down
///
/// `HEARTH_BACKUP_BEFORE_DESTROY` instructs the job to snapshot world
/// data to the backup bucket before releasing compute resources.
pub fn deprovision_job_spec(target_id: &TargetId, platform: &PlatformConfig) -> JobSpec {
    let mut environment = base_environment(target_id, platform);
    environment.insert("HEARTH_BACKUP_BEFORE_DESTROY".to_string(), "true".to_string());

    JobSpec {
        command: deployer_command("down"),
        environment,
        resource_limits: ResourceLimits::default(),
    }
}

fn base_environment(target_id: &TargetId, platform: &PlatformConfig) -> BTreeMap<String, String> {
    let mut environment = BTreeMap::new();
    environment.insert("HEARTH_TARGET_ID".to_string(), target_id.as_str().to_string());
    environment.insert(
        "HEARTH_BACKUP_BUCKET".to_string(),
        platform.backup_bucket.clone(),
    );
    environment
}

fn deployer_command(action: &str) -> Vec<String> {
    vec!["hearth-deployer".to_string(), action.to_string()]
}
