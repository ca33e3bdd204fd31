// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision policy and identity loading.

use serde::Deserialize;
use warden_access_core::DefaultPolicy;

use crate::error::ConfigError;

const DEFAULT_CACHE_PREFIX: &str = "Permission::action::";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
	pub default_policy: DefaultPolicy,
	/// Add `any_user` / `authenticated_user` to loaded identities.
	pub load_system_roles: bool,
	/// Prefix for expansion cache keys.
	pub cache_prefix: String,
}

impl Default for AccessConfig {
	fn default() -> Self {
		Self {
			default_policy: DefaultPolicy::DenyByDefault,
			load_system_roles: true,
			cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfigLayer {
	/// `deny` or `allow`.
	#[serde(default)]
	pub default_policy: Option<String>,
	#[serde(default)]
	pub load_system_roles: Option<bool>,
	#[serde(default)]
	pub cache_prefix: Option<String>,
}

impl AccessConfigLayer {
	pub fn merge(&mut self, other: AccessConfigLayer) {
		if other.default_policy.is_some() {
			self.default_policy = other.default_policy;
		}
		if other.load_system_roles.is_some() {
			self.load_system_roles = other.load_system_roles;
		}
		if other.cache_prefix.is_some() {
			self.cache_prefix = other.cache_prefix;
		}
	}

	pub fn finalize(self) -> Result<AccessConfig, ConfigError> {
		let default_policy = match self.default_policy {
			Some(policy) => policy
				.parse::<DefaultPolicy>()
				.map_err(|message| ConfigError::InvalidValue {
					key: "access.default_policy".to_string(),
					message,
				})?,
			None => DefaultPolicy::DenyByDefault,
		};

		Ok(AccessConfig {
			default_policy,
			load_system_roles: self.load_system_roles.unwrap_or(true),
			cache_prefix: self
				.cache_prefix
				.unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = AccessConfigLayer::default().finalize().unwrap();
		assert_eq!(config, AccessConfig::default());
		assert_eq!(config.default_policy, DefaultPolicy::DenyByDefault);
	}

	#[test]
	fn test_allow_policy() {
		let layer = AccessConfigLayer {
			default_policy: Some("allow".to_string()),
			..Default::default()
		};
		assert_eq!(layer.finalize().unwrap().default_policy, DefaultPolicy::AllowByDefault);
	}

	#[test]
	fn test_invalid_policy() {
		let layer = AccessConfigLayer {
			default_policy: Some("sometimes".to_string()),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "access.default_policy"));
	}
}
