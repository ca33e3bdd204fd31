// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant records: persisted allow/deny rules binding an action to an owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::need::{action_cache_key, validate_action_name, Need};
use crate::registry::Registry;
use crate::types::{GrantId, RoleId, UserId};

/// The owner a grant applies to. Exactly one per grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantOwner {
	User { id: UserId },
	Role { id: RoleId, name: String },
	SystemRole { name: String },
}

impl GrantOwner {
	pub fn user(id: impl Into<UserId>) -> Self {
		GrantOwner::User { id: id.into() }
	}

	pub fn role(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
		GrantOwner::Role {
			id: id.into(),
			name: name.into(),
		}
	}

	pub fn system_role(name: impl Into<String>) -> Self {
		GrantOwner::SystemRole { name: name.into() }
	}

	/// Concrete need an identity must provide to match this owner.
	pub fn need(&self) -> Need {
		match self {
			GrantOwner::User { id } => Need::User(*id),
			GrantOwner::Role { name, .. } => Need::Role(name.clone()),
			GrantOwner::SystemRole { name } => Need::SystemRole(name.clone()),
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			GrantOwner::User { .. } => "user",
			GrantOwner::Role { .. } => "role",
			GrantOwner::SystemRole { .. } => "system_role",
		}
	}

	/// Rejects system-role owners that are not in the registry catalogue.
	pub fn validate(&self, registry: &Registry) -> Result<()> {
		match self {
			GrantOwner::SystemRole { name } if !registry.has_system_role(name) => {
				Err(CoreError::UnregisteredSystemRole(name.clone()))
			}
			_ => Ok(()),
		}
	}
}

impl fmt::Display for GrantOwner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GrantOwner::User { id } => write!(f, "user:{id}"),
			GrantOwner::Role { name, .. } => write!(f, "role:{name}"),
			GrantOwner::SystemRole { name } => write!(f, "system_role:{name}"),
		}
	}
}

/// A stored grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
	pub id: GrantId,
	pub action: String,
	/// `None` is the wildcard: the grant applies to every argument value.
	pub argument: Option<String>,
	/// `true` denies, `false` allows.
	pub exclude: bool,
	pub owner: GrantOwner,
	pub created_at: DateTime<Utc>,
}

impl Grant {
	pub fn need(&self) -> Need {
		self.owner.need()
	}

	pub fn cache_key(&self) -> String {
		action_cache_key(&self.action, self.argument.as_deref())
	}

	pub fn is_wildcard(&self) -> bool {
		self.argument.is_none()
	}

	pub fn verb(&self) -> &'static str {
		if self.exclude {
			"deny"
		} else {
			"allow"
		}
	}
}

/// A grant that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrant {
	pub action: String,
	pub argument: Option<String>,
	pub exclude: bool,
	pub owner: GrantOwner,
}

impl NewGrant {
	pub fn allow(action: impl Into<String>, owner: GrantOwner) -> Self {
		Self {
			action: action.into(),
			argument: None,
			exclude: false,
			owner,
		}
	}

	pub fn deny(action: impl Into<String>, owner: GrantOwner) -> Self {
		Self {
			exclude: true,
			..Self::allow(action, owner)
		}
	}

	pub fn with_argument(mut self, argument: Option<impl ToString>) -> Self {
		self.argument = argument.map(|a| a.to_string());
		self
	}

	pub fn cache_key(&self) -> String {
		action_cache_key(&self.action, self.argument.as_deref())
	}

	pub fn validate(&self, registry: &Registry) -> Result<()> {
		validate_action_name(&self.action)?;
		self.owner.validate(registry)
	}
}

/// Field changes for an existing grant. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantUpdate {
	pub action: Option<String>,
	/// `Some(None)` turns the grant into a wildcard.
	pub argument: Option<Option<String>>,
	pub exclude: Option<bool>,
	pub owner: Option<GrantOwner>,
}

impl GrantUpdate {
	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn argument(mut self, argument: Option<impl ToString>) -> Self {
		self.argument = Some(argument.map(|a| a.to_string()));
		self
	}

	pub fn exclude(mut self, exclude: bool) -> Self {
		self.exclude = Some(exclude);
		self
	}

	pub fn owner(mut self, owner: GrantOwner) -> Self {
		self.owner = Some(owner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.action.is_none() && self.argument.is_none() && self.exclude.is_none() && self.owner.is_none()
	}

	/// The grant as it will look once this update is applied.
	pub fn apply(&self, grant: &Grant) -> Grant {
		Grant {
			id: grant.id,
			action: self.action.clone().unwrap_or_else(|| grant.action.clone()),
			argument: self.argument.clone().unwrap_or_else(|| grant.argument.clone()),
			exclude: self.exclude.unwrap_or(grant.exclude),
			owner: self.owner.clone().unwrap_or_else(|| grant.owner.clone()),
			created_at: grant.created_at,
		}
	}
}

/// Listing filter. Empty filter lists every grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantFilter {
	pub action: Option<String>,
	pub owner: Option<GrantOwner>,
}

impl GrantFilter {
	pub fn for_owner(owner: GrantOwner) -> Self {
		Self {
			action: None,
			owner: Some(owner),
		}
	}

	pub fn for_action(action: impl Into<String>) -> Self {
		Self {
			action: Some(action.into()),
			owner: None,
		}
	}
}
