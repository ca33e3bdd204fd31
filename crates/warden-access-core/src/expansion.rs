// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expansion results and the allow/deny decision rule.
//!
//! An [`Expansion`] is the pair of concrete need sets an action resolves to:
//! `needs` (any one suffices) and `excludes` (any one vetoes). The decision
//! rule, in order:
//!
//! 1. an identity holding any excluded need is denied;
//! 2. an empty `needs` set allows (only produced under allow-by-default);
//! 3. an identity holding any needed need is allowed;
//! 4. everything else is denied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::identity::Identity;
use crate::need::{ActionNeed, Need};

/// Fallback when an action has no matching grants at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
	/// Nothing granted means nobody may act. The recommended policy.
	#[default]
	DenyByDefault,
	/// Nothing granted means everybody may act.
	///
	/// Legacy behaviour kept for compatibility; an action nobody remembered to
	/// restrict is open to every caller. Prefer [`DefaultPolicy::DenyByDefault`].
	AllowByDefault,
}

impl DefaultPolicy {
	/// Folds the implicit superuser expansion into the expansion of the
	/// permission's own needs and applies the fallback.
	///
	/// `action_needs` are the permission's action needs; under deny-by-default
	/// they become a sentinel `needs` entry when nothing was granted, which no
	/// identity can hold.
	pub fn combine(self, requested: Expansion, superuser: Expansion, action_needs: &[ActionNeed]) -> Expansion {
		let mut result = requested;
		match self {
			DefaultPolicy::DenyByDefault => {
				result.merge(superuser);
				if result.needs.is_empty() {
					result
						.needs
						.extend(action_needs.iter().cloned().map(Need::Action));
				}
			}
			DefaultPolicy::AllowByDefault => {
				if result.needs.is_empty() {
					// Nothing restricts the requested actions; the superuser
					// needs would only narrow an open permission.
					result.excludes.extend(superuser.excludes);
				} else {
					result.merge(superuser);
				}
			}
		}
		result
	}
}

impl fmt::Display for DefaultPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DefaultPolicy::DenyByDefault => write!(f, "deny"),
			DefaultPolicy::AllowByDefault => write!(f, "allow"),
		}
	}
}

impl std::str::FromStr for DefaultPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"deny" | "deny_by_default" | "deny-by-default" => Ok(DefaultPolicy::DenyByDefault),
			"allow" | "allow_by_default" | "allow-by-default" => Ok(DefaultPolicy::AllowByDefault),
			other => Err(format!("unknown default policy '{other}', expected 'deny' or 'allow'")),
		}
	}
}

/// The concrete needs an action (or a whole permission) resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
	pub needs: BTreeSet<Need>,
	pub excludes: BTreeSet<Need>,
}

impl Expansion {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, need: Need, exclude: bool) {
		if exclude {
			self.excludes.insert(need);
		} else {
			self.needs.insert(need);
		}
	}

	pub fn merge(&mut self, other: Expansion) {
		self.needs.extend(other.needs);
		self.excludes.extend(other.excludes);
	}

	pub fn is_empty(&self) -> bool {
		self.needs.is_empty() && self.excludes.is_empty()
	}

	pub fn decide(&self, identity: &Identity) -> Decision {
		if let Some(need) = self.excludes.iter().find(|n| identity.holds(n)) {
			return Decision::Excluded(need.clone());
		}
		if self.needs.is_empty() {
			return Decision::AllowedByDefault;
		}
		match self.needs.iter().find(|n| identity.holds(n)) {
			Some(need) => Decision::Granted(need.clone()),
			None => Decision::NotGranted,
		}
	}

	pub fn allows(&self, identity: &Identity) -> bool {
		self.decide(identity).is_allowed()
	}
}

/// Outcome of evaluating an expansion against an identity, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	/// The identity holds a denied need. Deny always wins.
	Excluded(Need),
	/// The identity holds a granted need.
	Granted(Need),
	/// Nothing restricts the permission.
	AllowedByDefault,
	/// The identity holds none of the granted needs.
	NotGranted,
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Granted(_) | Decision::AllowedByDefault)
	}
}
