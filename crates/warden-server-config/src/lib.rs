// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Warden.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. TOML file (`/etc/warden/access.toml` unless another path is given)
//! 3. environment variables (`WARDEN_*`)
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::WardenConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH};

use tracing::{debug, info, warn};
use warden_access_core::DefaultPolicy;

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct WardenConfig {
	pub database: DatabaseConfig,
	pub access: AccessConfig,
	pub cache: CacheConfig,
	pub catalogue: CatalogueConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<WardenConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<std::path::PathBuf>) -> Result<WardenConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<WardenConfig, ConfigError> {
	load_from(vec![Box::new(EnvSource)])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<WardenConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = WardenConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: WardenConfigLayer) -> Result<WardenConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let access = layer.access.unwrap_or_default().finalize()?;
	let cache = layer.cache.unwrap_or_default().finalize();
	let catalogue = layer.catalogue.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&access, &cache)?;

	info!(
		database = %database.url,
		default_policy = %access.default_policy,
		load_system_roles = access.load_system_roles,
		cache_enabled = cache.enabled,
		cache_ttl_secs = ?cache.ttl_secs,
		catalogue_actions = catalogue.actions.len(),
		"Warden configuration loaded"
	);

	Ok(WardenConfig {
		database,
		access,
		cache,
		catalogue,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(access: &AccessConfig, cache: &CacheConfig) -> Result<(), ConfigError> {
	if cache.enabled && cache.max_entries == 0 {
		return Err(ConfigError::Validation(
			"cache.max_entries must be at least 1 when the cache is enabled".to_string(),
		));
	}

	if access.default_policy == DefaultPolicy::AllowByDefault {
		warn!(
			"access.default_policy = allow: actions without grants are open to every caller. \
			 Prefer deny and grant access explicitly."
		);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_defaults_finalize() {
		let config = finalize(WardenConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, "sqlite:./warden.db");
		assert_eq!(config.access.default_policy, DefaultPolicy::DenyByDefault);
		assert!(!config.cache.enabled);
		assert_eq!(config.logging.level, "info");
		assert!(config.catalogue.actions.is_empty());
	}

	#[test]
	fn test_zero_max_entries_rejected_when_enabled() {
		let cache = CacheConfig {
			enabled: true,
			max_entries: 0,
			..Default::default()
		};
		assert!(validate_config(&AccessConfig::default(), &cache).is_err());

		let disabled = CacheConfig {
			max_entries: 0,
			..Default::default()
		};
		assert!(validate_config(&AccessConfig::default(), &disabled).is_ok());
	}

	#[test]
	fn test_file_layered_over_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/tmp/warden-test.db"

[cache]
enabled = true
ttl_secs = 30

[catalogue]
system_roles = ["support_staff"]

[[catalogue.actions]]
name = "open"
parameterized = true
"#
		)
		.unwrap();

		let config = load_from(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:/tmp/warden-test.db");
		assert!(config.cache.enabled);
		assert_eq!(config.cache.ttl_secs, Some(30));
		assert_eq!(config.catalogue.system_roles, vec!["support_staff"]);
		assert_eq!(config.access.cache_prefix, "Permission::action::");
	}
}
