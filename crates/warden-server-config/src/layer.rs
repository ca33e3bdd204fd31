// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source.

use serde::Deserialize;

use crate::sections::{
	AccessConfigLayer, CacheConfigLayer, CatalogueConfigLayer, DatabaseConfigLayer, LoggingConfigLayer,
};

/// One source's view of the configuration. Unset sections and fields are
/// `None` and leave lower-precedence values in place when merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardenConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub access: Option<AccessConfigLayer>,
	#[serde(default)]
	pub cache: Option<CacheConfigLayer>,
	#[serde(default)]
	pub catalogue: Option<CatalogueConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		match target {
			Some(current) => merge(current, other),
			None => *target = Some(other),
		}
	}
}

impl WardenConfigLayer {
	pub fn merge(&mut self, other: WardenConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.access, other.access, AccessConfigLayer::merge);
		merge_section(&mut self.cache, other.cache, CacheConfigLayer::merge);
		merge_section(&mut self.catalogue, other.catalogue, CatalogueConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_keeps_lower_values_for_unset_fields() {
		let mut base: WardenConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite:/var/lib/warden/warden.db"

			[cache]
			enabled = true
			ttl_secs = 60
			"#,
		)
		.unwrap();

		let overlay = WardenConfigLayer {
			cache: Some(CacheConfigLayer {
				ttl_secs: Some(5),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(overlay);

		let cache = base.cache.unwrap();
		assert_eq!(cache.enabled, Some(true));
		assert_eq!(cache.ttl_secs, Some(5));
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite:/var/lib/warden/warden.db")
		);
	}
}
