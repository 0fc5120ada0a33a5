//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. `VALOISAN_CONFIG` environment variable (absolute path).
//! 2. `~/.valoisan/config.json`
//! 3. If none found, defaults.
//!
//! JSON keys are normalized from camelCase to snake_case before
//! deserialization, so config files written by the extension's own
//! tooling (camelCase) and hand-written ones (snake_case) both load.

use std::path::{Path, PathBuf};

use serde_json::Value;
use valoisan_types::config::RelayConfig;

use crate::env::Environment;
use crate::error::PlatformError;

/// Environment variable overriding config discovery.
pub const CONFIG_ENV_VAR: &str = "VALOISAN_CONFIG";

/// Discover the config file path.
///
/// Returns `None` if no config file exists at any candidate location.
/// The `VALOISAN_CONFIG` path is returned without an existence check so
/// that a typo surfaces as a load error instead of silently using defaults.
pub fn discover_config_path(env: &dyn Environment, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(env_path) = env.get_var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".valoisan").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Read and key-normalize the JSON config at `path`.
pub async fn load_config_raw(path: &Path) -> Result<Value, PlatformError> {
    tracing::debug!(path = %path.display(), "loading config file");
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        PlatformError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;

    let value: Value = serde_json::from_str(&contents).map_err(|e| {
        PlatformError::Config(format!("failed to parse config file {}: {e}", path.display()))
    })?;

    Ok(normalize_keys(value))
}

/// Load the relay config from an explicit path or via discovery.
///
/// Returns [`RelayConfig::default`] when no file is found.
pub async fn load_config(
    env: &dyn Environment,
    home_dir: Option<PathBuf>,
    config_override: Option<&Path>,
) -> Result<RelayConfig, PlatformError> {
    let path = match config_override {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_path(env, home_dir),
    };

    let Some(path) = path else {
        tracing::info!("no config file found, using defaults");
        return Ok(RelayConfig::default());
    };

    let raw = load_config_raw(&path).await?;
    let config: RelayConfig = serde_json::from_value(raw).map_err(|e| {
        PlatformError::Config(format!("invalid config in {}: {e}", path.display()))
    })?;
    config
        .validate()
        .map_err(|e| PlatformError::Config(e.to_string()))?;
    Ok(config)
}

/// Convert camelCase JSON keys to snake_case recursively.
///
/// Non-object/array values are returned unchanged.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut new_map = serde_json::Map::new();
            for (key, val) in map {
                new_map.insert(camel_to_snake(&key), normalize_keys(val));
            }
            Value::Object(new_map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// A run of uppercase letters (an acronym) is kept together; an
/// underscore goes before its last letter only when a lowercase letter
/// follows.
///
/// # Examples
/// ```
/// # use valoisan_platform::config_loader::camel_to_snake;
/// assert_eq!(camel_to_snake("callTimeoutMs"), "call_timeout_ms");
/// assert_eq!(camel_to_snake("already_snake"), "already_snake");
/// assert_eq!(camel_to_snake("onboardingURL"), "onboarding_url");
/// assert_eq!(camel_to_snake("XMLParser"), "xml_parser");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase()
                || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase()))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MemoryEnvironment;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn camel_to_snake_cases() {
        assert_eq!(camel_to_snake("pollIntervalMs"), "poll_interval_ms");
        assert_eq!(camel_to_snake("legacyStateKey"), "legacy_state_key");
        assert_eq!(camel_to_snake("model"), "model");
        assert_eq!(camel_to_snake("HTML"), "html");
        assert_eq!(camel_to_snake("Config"), "config");
        assert_eq!(camel_to_snake(""), "");
    }

    #[test]
    fn normalize_keys_recurses() {
        let input = json!({
            "callTimeoutMs": 5,
            "nestedThing": [{"innerKey": true}]
        });
        let expected = json!({
            "call_timeout_ms": 5,
            "nested_thing": [{"inner_key": true}]
        });
        assert_eq!(normalize_keys(input), expected);
        assert_eq!(normalize_keys(json!(null)), json!(null));
    }

    #[test]
    fn env_var_takes_precedence() {
        let env = MemoryEnvironment::new().with_var(CONFIG_ENV_VAR, "/custom/config.json");
        let result = discover_config_path(&env, Some(PathBuf::from("/home/user")));
        assert_eq!(result, Some(PathBuf::from("/custom/config.json")));
    }

    #[test]
    fn nothing_found_without_home() {
        let env = MemoryEnvironment::new();
        assert_eq!(discover_config_path(&env, None), None);
    }

    #[test]
    fn home_candidate_requires_file() {
        let home = TempDir::new().unwrap();
        let env = MemoryEnvironment::new();
        assert_eq!(discover_config_path(&env, Some(home.path().to_path_buf())), None);

        let dir = home.path().join(".valoisan");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();
        assert_eq!(
            discover_config_path(&env, Some(home.path().to_path_buf())),
            Some(dir.join("config.json"))
        );
    }

    #[tokio::test]
    async fn load_defaults_when_missing() {
        let env = MemoryEnvironment::new();
        let config = load_config(&env, None, None).await.unwrap();
        assert_eq!(config.call_timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn load_camel_case_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"callTimeoutMs": 1500, "onboardingUrl": "https://example.com/welcome"}"#,
        )
        .unwrap();

        let env = MemoryEnvironment::new();
        let config = load_config(&env, None, Some(path.as_path())).await.unwrap();
        assert_eq!(config.call_timeout_ms, 1500);
        assert_eq!(config.onboarding_url, "https://example.com/welcome");
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[tokio::test]
    async fn load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pollIntervalMs": 0}"#).unwrap();

        let env = MemoryEnvironment::new();
        let err = load_config(&env, None, Some(path.as_path())).await.unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
    }

    #[tokio::test]
    async fn load_reports_unreadable_override() {
        let env = MemoryEnvironment::new();
        let err = load_config(&env, None, Some(Path::new("/nonexistent/valoisan.json")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
