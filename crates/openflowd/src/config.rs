//! Worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reserved controller uuid meaning "no `ofcs` row to update".
pub const DEFAULT_OFC_UUID: &str = "Default";

/// Tunables for one controller worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Uuid of the `ofcs` row this worker serves. Health is not written for
    /// the reserved [`DEFAULT_OFC_UUID`].
    pub ofc_uuid: String,
    /// Enforce the single-VLAN constraints on multipoint data networks.
    pub nets_with_same_vlan: bool,
    /// Skip controller mutations on clear-all and the switch-port validity
    /// pre-check during planning.
    pub test_mode: bool,
    /// Bounded task queue capacity.
    pub queue_capacity: usize,
    /// How long task producers may block on a full queue.
    pub enqueue_timeout: Duration,
    /// Worker sleep between polls of an empty queue.
    pub idle_poll: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ofc_uuid: DEFAULT_OFC_UUID.to_string(),
            nets_with_same_vlan: false,
            test_mode: false,
            queue_capacity: 2000,
            enqueue_timeout: Duration::from_secs(5),
            idle_poll: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    /// Default configuration serving the given controller.
    pub fn for_ofc(uuid: impl Into<String>) -> Self {
        Self {
            ofc_uuid: uuid.into(),
            ..Self::default()
        }
    }

    /// Environment-driven configuration, the way the daemon binary wires it.
    ///
    /// `OFC_UUID` names the controller row; `OF_NETS_WITH_SAME_VLAN` and
    /// `OF_TEST_MODE` are boolean flags (`1`/`true`/`yes`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(uuid) = std::env::var("OFC_UUID") {
            config.ofc_uuid = uuid;
        }
        config.nets_with_same_vlan = env_flag("OF_NETS_WITH_SAME_VLAN");
        config.test_mode = env_flag("OF_TEST_MODE");
        config
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.ofc_uuid, DEFAULT_OFC_UUID);
        assert!(!config.nets_with_same_vlan);
        assert!(!config.test_mode);
        assert_eq!(config.queue_capacity, 2000);
        assert_eq!(config.enqueue_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_poll, Duration::from_secs(1));
    }

    #[test]
    fn test_for_ofc() {
        let config = WorkerConfig::for_ofc("ofc-1");
        assert_eq!(config.ofc_uuid, "ofc-1");
        assert_eq!(config.queue_capacity, 2000);
    }
}
