// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Catalogue of known actions and system roles.
//!
//! The registry is built once at startup and then shared read-only
//! (`Arc<Registry>`) with the grant store, the expansion engine, the identity
//! loader and the admin operations. Registration happens either directly or
//! through [`CatalogueProvider`]s; registering the same name twice is a
//! catalogue misconfiguration and fails.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::need::{validate_action_name, ActionNeed, Need, ANY_USER, AUTHENTICATED_USER, SUPERUSER_ACCESS};

/// A registered action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
	pub name: String,
	/// Whether the action accepts an argument.
	#[serde(default)]
	pub parameterized: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

impl ActionDescriptor {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			parameterized: false,
			description: None,
		}
	}

	pub fn parameterized(name: impl Into<String>) -> Self {
		Self {
			parameterized: true,
			..Self::new(name)
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn need(&self) -> ActionNeed {
		ActionNeed::new(self.name.clone())
	}
}

impl From<&str> for ActionDescriptor {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// A source of actions and system roles discovered at startup.
pub trait CatalogueProvider: Send + Sync {
	fn name(&self) -> &str;
	fn actions(&self) -> Vec<ActionDescriptor>;
	fn system_roles(&self) -> Vec<String> {
		Vec::new()
	}
}

/// The superuser action and the two system roles every deployment has.
pub struct BuiltinCatalogue;

impl CatalogueProvider for BuiltinCatalogue {
	fn name(&self) -> &str {
		"builtin"
	}

	fn actions(&self) -> Vec<ActionDescriptor> {
		vec![ActionDescriptor::new(SUPERUSER_ACCESS).with_description("Global bypass of every permission")]
	}

	fn system_roles(&self) -> Vec<String> {
		vec![ANY_USER.to_string(), AUTHENTICATED_USER.to_string()]
	}
}

/// Listing view of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogue {
	pub actions: Vec<ActionDescriptor>,
	pub system_roles: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
	actions: BTreeMap<String, ActionDescriptor>,
	system_roles: BTreeSet<String>,
}

impl Registry {
	/// An empty registry. Most callers want [`Registry::with_builtins`].
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		for action in BuiltinCatalogue.actions() {
			registry.actions.insert(action.name.clone(), action);
		}
		registry.system_roles.extend(BuiltinCatalogue.system_roles());
		registry
	}

	/// Builtins plus everything the providers declare, in order.
	///
	/// The builtins are always present, so [`BuiltinCatalogue`] must not be
	/// passed as a provider.
	pub fn discover(providers: &[&dyn CatalogueProvider]) -> Result<Self> {
		let mut registry = Self::with_builtins();
		for provider in providers {
			registry.load(*provider)?;
		}
		Ok(registry)
	}

	pub fn load(&mut self, provider: &dyn CatalogueProvider) -> Result<()> {
		let actions = provider.actions();
		let system_roles = provider.system_roles();
		debug!(
			provider = provider.name(),
			actions = actions.len(),
			system_roles = system_roles.len(),
			"loading catalogue provider"
		);
		for action in actions {
			self.register_action(action)?;
		}
		for role in system_roles {
			self.register_system_role(role)?;
		}
		Ok(())
	}

	pub fn register_action(&mut self, action: impl Into<ActionDescriptor>) -> Result<()> {
		let action = action.into();
		validate_action_name(&action.name)?;
		if self.actions.contains_key(&action.name) {
			return Err(CoreError::DuplicateAction(action.name));
		}
		self.actions.insert(action.name.clone(), action);
		Ok(())
	}

	pub fn register_system_role(&mut self, name: impl Into<String>) -> Result<()> {
		let name = name.into();
		if !self.system_roles.insert(name.clone()) {
			return Err(CoreError::DuplicateSystemRole(name));
		}
		Ok(())
	}

	pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
		self.actions.get(name)
	}

	pub fn has_action(&self, name: &str) -> bool {
		self.actions.contains_key(name)
	}

	pub fn actions(&self) -> impl Iterator<Item = &ActionDescriptor> {
		self.actions.values()
	}

	pub fn has_system_role(&self, name: &str) -> bool {
		self.system_roles.contains(name)
	}

	/// The registered need for a system role name.
	pub fn system_role(&self, name: &str) -> Option<Need> {
		self.system_roles.get(name).map(|n| Need::SystemRole(n.clone()))
	}

	pub fn system_roles(&self) -> impl Iterator<Item = &str> {
		self.system_roles.iter().map(String::as_str)
	}

	pub fn catalogue(&self) -> Catalogue {
		Catalogue {
			actions: self.actions.values().cloned().collect(),
			system_roles: self.system_roles.iter().cloned().collect(),
		}
	}
}
