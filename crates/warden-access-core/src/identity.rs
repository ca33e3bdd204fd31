// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::need::Need;
use crate::types::UserId;

/// The caller being checked: the set of concrete needs it provides.
///
/// Action needs are capabilities to be expanded, not credentials, so they are
/// never stored here. Deserialization goes through [`Identity::provide`] too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IdentityRepr")]
pub struct Identity {
	provides: BTreeSet<Need>,
}

#[derive(Deserialize)]
struct IdentityRepr {
	#[serde(default)]
	provides: Vec<Need>,
}

impl From<IdentityRepr> for Identity {
	fn from(repr: IdentityRepr) -> Self {
		repr.provides.into_iter().collect()
	}
}

impl Identity {
	pub fn new() -> Self {
		Self::default()
	}

	/// An identity providing only its own user need.
	pub fn for_user(id: impl Into<UserId>) -> Self {
		Self::new().with(Need::User(id.into()))
	}

	/// Adds a need. Returns `false` if it was already present or is an action.
	pub fn provide(&mut self, need: Need) -> bool {
		if !need.is_concrete() {
			warn!(need = %need, "ignoring action need provided to an identity");
			return false;
		}
		self.provides.insert(need)
	}

	pub fn with(mut self, need: Need) -> Self {
		self.provide(need);
		self
	}

	pub fn holds(&self, need: &Need) -> bool {
		self.provides.contains(need)
	}

	pub fn provides(&self) -> impl Iterator<Item = &Need> {
		self.provides.iter()
	}

	pub fn user_id(&self) -> Option<UserId> {
		self.provides.iter().find_map(|n| match n {
			Need::User(id) => Some(*id),
			_ => None,
		})
	}

	pub fn len(&self) -> usize {
		self.provides.len()
	}

	pub fn is_empty(&self) -> bool {
		self.provides.is_empty()
	}
}

impl FromIterator<Need> for Identity {
	fn from_iter<I: IntoIterator<Item = Need>>(iter: I) -> Self {
		let mut identity = Identity::new();
		for need in iter {
			identity.provide(need);
		}
		identity
	}
}
