use crate::backend::demo::DemoConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use streckcore::prelude::SecondUserPolicy;
use streckcore::KioskSettings;

/// Which implementation of the external service the kiosk talks to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Demo(DemoConfig),
    Http { base_url: String },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Demo(DemoConfig::default())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub countdown_seconds: u32,
    pub toast_ttl_secs: u64,
    pub second_user_policy: SecondUserPolicy,
    pub backend: BackendConfig,
    pub bridge_addr: SocketAddr,
}

impl Default for KioskConfig {
    fn default() -> Self {
        let settings = KioskSettings::default();
        Self {
            countdown_seconds: settings.countdown_seconds,
            toast_ttl_secs: settings.toast_ttl_secs,
            second_user_policy: settings.second_user_policy,
            backend: BackendConfig::default(),
            bridge_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl KioskConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading kiosk config {}", path_ref.display()))?;
        let config: KioskConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing kiosk config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn to_settings(&self) -> KioskSettings {
        KioskSettings {
            countdown_seconds: self.countdown_seconds,
            toast_ttl_secs: self.toast_ttl_secs,
            second_user_policy: self.second_user_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_core_settings() {
        let cfg = KioskConfig::default();
        let settings = cfg.to_settings();
        assert_eq!(settings.countdown_seconds, 8);
        assert_eq!(settings.toast_ttl_secs, 5);
        assert_eq!(settings.second_user_policy, SecondUserPolicy::Replace);
        assert_eq!(cfg.bridge_addr.port(), 9000);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"countdown_seconds: 12\nsecond_user_policy: reject\nbackend:\n  kind: http\n  base_url: http://till.local:8080\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = KioskConfig::load(&path).unwrap();
        assert_eq!(cfg.countdown_seconds, 12);
        assert_eq!(cfg.toast_ttl_secs, 5);
        assert_eq!(cfg.second_user_policy, SecondUserPolicy::Reject);
        assert_eq!(
            cfg.backend,
            BackendConfig::Http {
                base_url: "http://till.local:8080".into()
            }
        );
    }

    #[test]
    fn demo_backend_fields_are_optional() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"backend:\n  kind: demo\n  seed: 7\n").unwrap();
        let path = temp.into_temp_path();
        let cfg = KioskConfig::load(&path).unwrap();
        match cfg.backend {
            BackendConfig::Demo(demo) => {
                assert_eq!(demo.seed, 7);
                assert_eq!(demo.users, DemoConfig::default().users);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = KioskConfig::load("/nonexistent/kiosk.yaml").unwrap_err();
        assert!(err.to_string().contains("reading kiosk config"));
    }
}
