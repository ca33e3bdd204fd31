// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Actions and system roles declared in the config file.
//!
//! ```toml
//! [catalogue]
//! system_roles = ["support_staff"]
//!
//! [[catalogue.actions]]
//! name = "open"
//! parameterized = true
//! description = "Open a ticket"
//! ```

use serde::Deserialize;
use warden_access_core::{ActionDescriptor, CatalogueProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogueConfig {
	pub actions: Vec<ActionDescriptor>,
	pub system_roles: Vec<String>,
}

impl CatalogueProvider for CatalogueConfig {
	fn name(&self) -> &str {
		"config"
	}

	fn actions(&self) -> Vec<ActionDescriptor> {
		self.actions.clone()
	}

	fn system_roles(&self) -> Vec<String> {
		self.system_roles.clone()
	}
}

/// Later sources replace a list wholesale rather than appending to it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogueConfigLayer {
	#[serde(default)]
	pub actions: Option<Vec<ActionDescriptor>>,
	#[serde(default)]
	pub system_roles: Option<Vec<String>>,
}

impl CatalogueConfigLayer {
	pub fn merge(&mut self, other: CatalogueConfigLayer) {
		if other.actions.is_some() {
			self.actions = other.actions;
		}
		if other.system_roles.is_some() {
			self.system_roles = other.system_roles;
		}
	}

	pub fn finalize(self) -> CatalogueConfig {
		CatalogueConfig {
			actions: self.actions.unwrap_or_default(),
			system_roles: self.system_roles.unwrap_or_default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_access_core::{CoreError, Registry};

	#[test]
	fn test_parse_and_discover() {
		let layer: CatalogueConfigLayer = toml::from_str(
			r#"
			system_roles = ["support_staff"]

			[[actions]]
			name = "open"
			parameterized = true

			[[actions]]
			name = "close"
			"#,
		)
		.unwrap();
		let catalogue = layer.finalize();
		assert_eq!(catalogue.actions.len(), 2);
		assert!(catalogue.actions[0].parameterized);
		assert!(!catalogue.actions[1].parameterized);

		let registry = Registry::discover(&[&catalogue]).unwrap();
		assert!(registry.has_action("open"));
		assert!(registry.has_system_role("support_staff"));
		assert!(registry.has_system_role("any_user"));
	}

	#[test]
	fn test_redeclaring_builtin_fails() {
		let catalogue = CatalogueConfig {
			actions: vec![ActionDescriptor::new("superuser-access")],
			system_roles: Vec::new(),
		};
		assert_eq!(
			Registry::discover(&[&catalogue]).unwrap_err(),
			CoreError::DuplicateAction("superuser-access".to_string())
		);
	}
}
