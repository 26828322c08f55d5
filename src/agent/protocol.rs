use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Module key the agent uses for its storage backend.
pub const STORAGE_MODULE: &str = "storage";

/// Module key synthesised from the `zoom` section of the status document.
pub const ZOOM_MODULE: &str = "zoom";

/// Upper bound the agent keeps on `recent_errors`.
pub const MAX_RECENT_ERRORS: usize = 20;

// ============================================================================
// Status Document
// ============================================================================

/// A point-in-time status document returned by `GET /api/status`.
///
/// Replaced wholesale on every successful poll; never patched in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub uptime_seconds: Option<f64>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub modules: HashMap<String, ModuleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomStatus>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub recent_errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub deployment: Deployment,
}

impl StatusSnapshot {
    /// Look up a module by its status key.
    pub fn module(&self, key: &str) -> Option<&ModuleStatus> {
        self.modules.get(key)
    }

    /// Fold the standalone `zoom` section into the module map so the zoom
    /// poller node can be projected like any other module. An explicit
    /// `modules.zoom` entry from the agent always wins.
    pub fn normalize(mut self) -> Self {
        if let Some(zoom) = &self.zoom {
            if !self.modules.contains_key(ZOOM_MODULE) {
                let provider = (!zoom.email.is_empty()).then(|| zoom.email.clone());
                self.modules.insert(
                    ZOOM_MODULE.to_string(),
                    ModuleStatus {
                        enabled: zoom.enabled,
                        provider,
                        ..ModuleStatus::default()
                    },
                );
            }
        }
        self
    }

    /// Human-readable uptime, e.g. `2d 3h 14m`.
    pub fn uptime_display(&self) -> Option<String> {
        self.uptime_seconds.map(format_uptime)
    }
}

/// Status of one agent module.
///
/// Every module reports `enabled`; the rest are populated per module
/// (storage carries the `local`/`s3` flags, the model-backed modules carry
/// `provider` and `model`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModuleStatus {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ZoomStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub transcript_count: u64,
    #[serde(default)]
    pub last_poll: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    #[serde(default)]
    pub transcriptions: u64,
    #[serde(default)]
    pub chats: u64,
    #[serde(default)]
    pub files: u64,
}

/// An error the agent recorded, in the order the agent delivered it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub message: String,
}

/// Where the agent process is running.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum DeploymentKind {
    #[default]
    Local,
    AwsEcs,
    AwsEc2,
    Docker,
    Systemd,
    Other(String),
}

impl DeploymentKind {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentKind::Local => "local",
            DeploymentKind::AwsEcs => "aws-ecs",
            DeploymentKind::AwsEc2 => "aws-ec2",
            DeploymentKind::Docker => "docker",
            DeploymentKind::Systemd => "systemd",
            DeploymentKind::Other(s) => s,
        }
    }
}

impl From<String> for DeploymentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "local" => DeploymentKind::Local,
            "aws-ecs" => DeploymentKind::AwsEcs,
            "aws-ec2" => DeploymentKind::AwsEc2,
            "docker" => DeploymentKind::Docker,
            "systemd" => DeploymentKind::Systemd,
            _ => DeploymentKind::Other(s),
        }
    }
}

impl From<DeploymentKind> for String {
    fn from(kind: DeploymentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deployment {
    #[serde(default, rename = "type")]
    pub kind: DeploymentKind,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub private_ip: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub detail: String,
    /// Runtime version string of the agent process.
    #[serde(default)]
    pub python: String,
    #[serde(default)]
    pub os: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

// ============================================================================
// Config Catalog
// ============================================================================

/// One entry of the agent's config catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigItem {
    pub key: String,
    pub group: String,
    pub label: String,
    /// Current effective value; secrets arrive already masked.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_set: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Response of `GET /api/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigCatalog {
    #[serde(default)]
    pub config: Vec<ConfigItem>,
    /// Where the agent persists its config. Opaque to the console.
    #[serde(default)]
    pub env_file: String,
}

impl ConfigCatalog {
    pub fn item(&self, key: &str) -> Option<&ConfigItem> {
        self.config.iter().find(|item| item.key == key)
    }
}

/// Body of `POST /api/config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveConfigRequest {
    pub changes: BTreeMap<String, String>,
}

/// Response of `POST /api/config`. Informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveConfigResponse {
    #[serde(default)]
    pub status: String,
    /// Keys the agent accepted; unknown keys are skipped by the agent.
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Response of `POST /api/restart`, when the agent manages to reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartResponse {
    #[serde(default)]
    pub status: String,
}

/// Format seconds as `Xd Yh Zm`, dropping leading zero units.
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{total}s")
    }
}
