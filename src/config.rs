use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::DEFAULT_SAMPLE_INTERVAL;
use crate::parsing::parse_duration;
use crate::types::Config;

pub const DEFAULT_COLLECTION_PERIOD: &str = "5m";
pub const DEFAULT_FETCH_TIMEOUT: &str = "10s";
pub const DEFAULT_REPORT_DIR: &str = "performance-reports";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let collection_period = duration_var(env, "COLLECTION_PERIOD")?
        .unwrap_or(parse_duration(DEFAULT_COLLECTION_PERIOD)?);

    let sample_interval = duration_var(env, "SAMPLE_INTERVAL")?.unwrap_or(DEFAULT_SAMPLE_INTERVAL);
    if sample_interval.is_zero() {
        return Err(anyhow!("SAMPLE_INTERVAL must be greater than zero"));
    }

    // 0 disables the per-request deadline
    let fetch_timeout = duration_var(env, "FETCH_TIMEOUT")?
        .unwrap_or(parse_duration(DEFAULT_FETCH_TIMEOUT)?);
    let fetch_timeout = (!fetch_timeout.is_zero()).then_some(fetch_timeout);

    let report_dir = non_empty(env, "REPORT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR));

    let fail_if_no_metrics = env
        .get_var("FAIL_IF_NO_METRICS")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    Ok(Config {
        collection_period,
        sample_interval,
        fetch_timeout,
        namespace: non_empty(env, "NAMESPACE"),
        kube_context: non_empty(env, "KUBE_CONTEXT"),
        kubeconfig_path: non_empty(env, "KUBECONFIG_PATH").map(PathBuf::from),
        report_dir,
        fail_if_no_metrics,
    })
}

fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn duration_var<E: EnvironmentProvider>(env: &E, key: &str) -> Result<Option<Duration>> {
    non_empty(env, key)
        .map(|v| parse_duration(&v).with_context(|| format!("Invalid {}", key)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loading_with_env() {
        let env = MockEnvironment::new()
            .with_var("COLLECTION_PERIOD", "30m")
            .with_var("SAMPLE_INTERVAL", "15s")
            .with_var("FETCH_TIMEOUT", "3s")
            .with_var("NAMESPACE", "shop")
            .with_var("KUBE_CONTEXT", "prod-eu")
            .with_var("KUBECONFIG_PATH", "/etc/kube/config")
            .with_var("REPORT_DIR", "/tmp/reports")
            .with_var("FAIL_IF_NO_METRICS", "true");

        let config = load_config_with_env(&env).unwrap();

        assert_eq!(config.collection_period, Duration::from_secs(1800));
        assert_eq!(config.sample_interval, Duration::from_secs(15));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.namespace, Some("shop".to_string()));
        assert_eq!(config.kube_context, Some("prod-eu".to_string()));
        assert_eq!(config.kubeconfig_path, Some(PathBuf::from("/etc/kube/config")));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert!(config.fail_if_no_metrics);
    }

    #[test]
    fn test_config_loading_defaults() {
        let config = load_config_with_env(&MockEnvironment::new()).unwrap();

        assert_eq!(config.collection_period, Duration::from_secs(300));
        assert_eq!(config.sample_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.namespace, None);
        assert_eq!(config.kube_context, None);
        assert_eq!(config.kubeconfig_path, None);
        assert_eq!(config.report_dir, PathBuf::from("performance-reports"));
        assert!(!config.fail_if_no_metrics);
    }

    #[test]
    fn test_invalid_durations_name_the_variable() {
        let env = MockEnvironment::new().with_var("COLLECTION_PERIOD", "five minutes");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("COLLECTION_PERIOD"));

        let env = MockEnvironment::new().with_var("SAMPLE_INTERVAL", "30");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("SAMPLE_INTERVAL"));
    }

    #[test]
    fn test_out_of_range_duration_is_an_error() {
        let env = MockEnvironment::new().with_var("COLLECTION_PERIOD", "99999999999999999999999h");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("COLLECTION_PERIOD"));
    }

    #[test]
    fn test_zero_sample_interval_rejected() {
        let env = MockEnvironment::new().with_var("SAMPLE_INTERVAL", "0");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_zero_fetch_timeout_disables_deadline() {
        let env = MockEnvironment::new().with_var("FETCH_TIMEOUT", "0");
        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.fetch_timeout, None);
    }

    #[test]
    fn test_blank_optional_values_are_unset() {
        let env = MockEnvironment::new()
            .with_var("NAMESPACE", "   ")
            .with_var("KUBE_CONTEXT", "")
            .with_var("REPORT_DIR", " ");
        let config = load_config_with_env(&env).unwrap();

        assert_eq!(config.namespace, None);
        assert_eq!(config.kube_context, None);
        assert_eq!(config.report_dir, PathBuf::from(DEFAULT_REPORT_DIR));
    }

    #[test]
    fn test_boolean_parsing() {
        for val in ["1", "true", "TRUE", "True"] {
            let env = MockEnvironment::new().with_var("FAIL_IF_NO_METRICS", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(config.fail_if_no_metrics, "Failed for value: {}", val);
        }

        for val in ["0", "false", "FALSE", "no", "off", ""] {
            let env = MockEnvironment::new().with_var("FAIL_IF_NO_METRICS", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(!config.fail_if_no_metrics, "Failed for value: {}", val);
        }
    }
}
