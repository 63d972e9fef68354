//! Configuration file parsing and management.
//!
//! Settings come from four layers, lowest precedence first: built-in
//! defaults, TOML config files, `DR_*` environment variables, and CLI
//! flags. This module owns the middle two; the CLI applies its flags last.

use crate::error::DomainResolveError;
use crate::types::{timeout_from_secs, ResolverBackend, RunConfig, MAX_WORKERS, MIN_WORKERS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Per-attempt timeout in seconds (fractions allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Concurrent lookups, 1-200
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Retries after the first failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// "hickory" or "system"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    /// First retry delay in milliseconds (0 disables backoff)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,

    /// Retry delay cap in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_max_ms: Option<u64>,
}

impl DefaultsConfig {
    /// Overlay these values onto `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> Result<RunConfig, DomainResolveError> {
        if let Some(secs) = self.timeout {
            config.timeout = timeout_from_secs(secs)?;
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(resolver) = &self.resolver {
            config.resolver = resolver.parse()?;
        }
        if let Some(ms) = self.backoff_ms {
            config.backoff_base = Duration::from_millis(ms);
        }
        if let Some(ms) = self.backoff_max_ms {
            config.backoff_max = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were found
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// A missing file is an error here; discovery only calls this for
    /// paths that exist.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainResolveError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainResolveError::config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainResolveError::config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainResolveError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Later files override earlier ones key by key: XDG config, then the
    /// home directory, then the current directory. A file that exists but
    /// is invalid is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainResolveError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let role = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where keys repeat"
                };
                tracing::info!(path = %path.display(), role, "config file");
            }
        }

        Ok(merged_config)
    }

    /// Config file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-resolve.toml", "./.domain-resolve.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Config file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-resolve.toml", "domain-resolve.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// `$XDG_CONFIG_HOME/domain-resolve/config.toml`, falling back to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-resolve").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    timeout: higher.timeout.or(lower.timeout),
                    workers: higher.workers.or(lower.workers),
                    retries: higher.retries.or(lower.retries),
                    verbose: higher.verbose.or(lower.verbose),
                    resolver: higher.resolver.or(lower.resolver),
                    backoff_ms: higher.backoff_ms.or(lower.backoff_ms),
                    backoff_max_ms: higher.backoff_max_ms.or(lower.backoff_max_ms),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainResolveError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(workers) = defaults.workers {
            if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
                return Err(DomainResolveError::config(format!(
                    "Workers must be between {} and {}",
                    MIN_WORKERS, MAX_WORKERS
                )));
            }
        }

        if let Some(timeout) = defaults.timeout {
            timeout_from_secs(timeout)?;
        }

        if let Some(resolver) = &defaults.resolver {
            resolver.parse::<ResolverBackend>()?;
        }

        if let (Some(base), Some(max)) = (defaults.backoff_ms, defaults.backoff_max_ms) {
            if max < base {
                return Err(DomainResolveError::config(
                    "backoff_max_ms must not be smaller than backoff_ms",
                ));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from `DR_*` variables. Invalid values are logged and ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub workers: Option<usize>,
    pub retries: Option<u32>,
    pub verbose: Option<bool>,
    pub resolver: Option<ResolverBackend>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay these values onto `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(resolver) = self.resolver {
            config.resolver = resolver;
        }
        config
    }
}

/// Load configuration from `DR_*` environment variables.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    env_config_from(|key| env::var(key).ok(), verbose)
}

fn env_config_from<F>(lookup: F, verbose: bool) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("DR_TIMEOUT") {
        match val.trim().parse::<f64>().map_err(|e| e.to_string()).and_then(|secs| {
            timeout_from_secs(secs).map_err(|e| e.to_string())
        }) {
            Ok(timeout) => {
                env_config.timeout = Some(timeout);
                note(verbose, "DR_TIMEOUT", &val);
            }
            Err(_) => tracing::warn!(value = %val, "ignoring DR_TIMEOUT, expected positive seconds"),
        }
    }

    if let Some(val) = lookup("DR_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if (MIN_WORKERS..=MAX_WORKERS).contains(&workers) => {
                env_config.workers = Some(workers);
                note(verbose, "DR_WORKERS", &val);
            }
            _ => tracing::warn!(
                value = %val,
                "ignoring DR_WORKERS, must be {}-{}",
                MIN_WORKERS,
                MAX_WORKERS
            ),
        }
    }

    if let Some(val) = lookup("DR_RETRIES") {
        match val.trim().parse::<u32>() {
            Ok(retries) => {
                env_config.retries = Some(retries);
                note(verbose, "DR_RETRIES", &val);
            }
            Err(_) => tracing::warn!(value = %val, "ignoring DR_RETRIES, expected a non-negative integer"),
        }
    }

    if let Some(val) = lookup("DR_VERBOSE") {
        match parse_bool(&val) {
            Some(flag) => {
                env_config.verbose = Some(flag);
                note(verbose, "DR_VERBOSE", &val);
            }
            None => tracing::warn!(value = %val, "ignoring DR_VERBOSE, use true/false"),
        }
    }

    if let Some(val) = lookup("DR_RESOLVER") {
        match val.parse::<ResolverBackend>() {
            Ok(backend) => {
                env_config.resolver = Some(backend);
                note(verbose, "DR_RESOLVER", &val);
            }
            Err(e) => tracing::warn!(value = %val, "ignoring DR_RESOLVER: {}", e),
        }
    }

    if let Some(path) = lookup("DR_CONFIG") {
        if !path.trim().is_empty() {
            note(verbose, "DR_CONFIG", &path);
            env_config.config = Some(path);
        }
    }

    env_config
}

fn note(verbose: bool, key: &str, value: &str) {
    if verbose {
        tracing::info!("using {}={}", key, value);
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn env_from(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_config_from(|key| vars.get(key).cloned(), false)
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
timeout = 2.5
workers = 25
retries = 4
resolver = "system"
backoff_ms = 50
"#,
        );

        let manager = ConfigManager::new(false);
        let defaults = manager.load_file(temp_file.path()).unwrap().defaults.unwrap();

        assert_eq!(defaults.timeout, Some(2.5));
        assert_eq!(defaults.workers, Some(25));
        assert_eq!(defaults.retries, Some(4));
        assert_eq!(defaults.resolver.as_deref(), Some("system"));

        let config = defaults.apply_to(RunConfig::default()).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.max_workers, 25);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.resolver, ResolverBackend::System);
        assert_eq!(config.backoff_base, Duration::from_millis(50));
        assert_eq!(config.backoff_max, Duration::from_millis(500));
    }

    #[test]
    fn test_integer_timeout_is_accepted() {
        let temp_file = write_config("[defaults]\ntimeout = 3\n");
        let defaults = ConfigManager::new(false)
            .load_file(temp_file.path())
            .unwrap()
            .defaults
            .unwrap();
        assert_eq!(defaults.timeout, Some(3.0));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let manager = ConfigManager::new(false);
        for content in [
            "[defaults]\nworkers = 0\n",
            "[defaults]\nworkers = 201\n",
            "[defaults]\ntimeout = -1.0\n",
            "[defaults]\nresolver = \"bind\"\n",
            "[defaults]\nbackoff_ms = 300\nbackoff_max_ms = 100\n",
            "[defaults]\nconcurrency = 10\n",
            "not toml at all [",
        ] {
            let temp_file = write_config(content);
            let result = manager.load_file(temp_file.path());
            assert!(
                matches!(result, Err(DomainResolveError::ConfigError { .. })),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new(false).load_file("/definitely/not/here.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(10),
                retries: Some(1),
                verbose: Some(false),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(25),
                verbose: Some(true),
                ..Default::default()
            }),
        };

        let defaults = manager.merge_configs(lower, higher).defaults.unwrap();
        assert_eq!(defaults.workers, Some(25));
        assert_eq!(defaults.retries, Some(1));
        assert_eq!(defaults.verbose, Some(true));

        let only_lower = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(3),
                ..Default::default()
            }),
        };
        let merged = manager.merge_configs(only_lower.clone(), FileConfig::default());
        assert_eq!(merged, only_lower);
    }

    #[test]
    fn test_env_config_parsing() {
        let env = env_from(&[
            ("DR_TIMEOUT", "1.5"),
            ("DR_WORKERS", "8"),
            ("DR_RETRIES", "0"),
            ("DR_VERBOSE", "yes"),
            ("DR_RESOLVER", "system"),
            ("DR_CONFIG", "/tmp/custom.toml"),
        ]);

        assert_eq!(env.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(env.workers, Some(8));
        assert_eq!(env.retries, Some(0));
        assert_eq!(env.verbose, Some(true));
        assert_eq!(env.resolver, Some(ResolverBackend::System));
        assert_eq!(env.config.as_deref(), Some("/tmp/custom.toml"));
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let env = env_from(&[
            ("DR_TIMEOUT", "0"),
            ("DR_WORKERS", "500"),
            ("DR_RETRIES", "-1"),
            ("DR_VERBOSE", "maybe"),
            ("DR_RESOLVER", "bind"),
            ("DR_CONFIG", "  "),
        ]);
        assert_eq!(env, EnvConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = DefaultsConfig {
            workers: Some(10),
            retries: Some(5),
            ..Default::default()
        };
        let env = env_from(&[("DR_WORKERS", "20")]);

        let config = env.apply_to(file.apply_to(RunConfig::default()).unwrap());
        assert_eq!(config.max_workers, 20);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
