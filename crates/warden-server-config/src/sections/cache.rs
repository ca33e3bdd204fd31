// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expansion cache configuration.

use serde::Deserialize;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
	pub enabled: bool,
	/// `None` keeps entries until a grant change invalidates them.
	pub ttl_secs: Option<u64>,
	pub max_entries: usize,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			ttl_secs: None,
			max_entries: DEFAULT_MAX_ENTRIES,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	/// `0` disables expiry.
	#[serde(default)]
	pub ttl_secs: Option<u64>,
	#[serde(default)]
	pub max_entries: Option<usize>,
}

impl CacheConfigLayer {
	pub fn merge(&mut self, other: CacheConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.ttl_secs.is_some() {
			self.ttl_secs = other.ttl_secs;
		}
		if other.max_entries.is_some() {
			self.max_entries = other.max_entries;
		}
	}

	pub fn finalize(self) -> CacheConfig {
		CacheConfig {
			enabled: self.enabled.unwrap_or(false),
			ttl_secs: self.ttl_secs.filter(|secs| *secs > 0),
			max_entries: self.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_disabled_by_default() {
		let config = CacheConfigLayer::default().finalize();
		assert!(!config.enabled);
		assert_eq!(config.ttl_secs, None);
		assert_eq!(config.max_entries, 10_000);
	}

	#[test]
	fn test_zero_ttl_means_no_expiry() {
		let layer = CacheConfigLayer {
			enabled: Some(true),
			ttl_secs: Some(0),
			max_entries: Some(16),
		};
		let config = layer.finalize();
		assert!(config.enabled);
		assert_eq!(config.ttl_secs, None);
		assert_eq!(config.max_entries, 16);
	}
}
