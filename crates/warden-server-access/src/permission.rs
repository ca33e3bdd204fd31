// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permissions: the requirement a caller declares before acting.

use std::collections::BTreeSet;
use std::fmt;

use warden_access_core::{ActionNeed, Decision, DefaultPolicy, Identity, Need};

use crate::engine::ExpansionEngine;
use crate::error::Result;

/// A set of needs, any one of which satisfies the permission, plus the
/// policy applied when no grant matches.
///
/// A permission holds no expansion state. Each query goes through the engine
/// (and its cache), so grant changes are observed on the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
	needs: BTreeSet<Need>,
	policy: DefaultPolicy,
}

impl Permission {
	pub fn new(needs: impl IntoIterator<Item = Need>) -> Self {
		Self {
			needs: needs.into_iter().collect(),
			policy: DefaultPolicy::default(),
		}
	}

	pub fn action(name: impl Into<String>) -> Self {
		Self::new([Need::action(name)])
	}

	pub fn parameterized(name: impl Into<String>, argument: impl ToString) -> Self {
		Self::new([Need::parameterized_action(name, argument)])
	}

	/// Permission for `name`, scoped when `argument` is present.
	pub fn for_action(name: impl Into<String>, argument: Option<&str>) -> Self {
		let action = ActionNeed::new(name);
		match argument {
			Some(argument) => Self::new([Need::Action(action.with_argument(argument))]),
			None => Self::new([Need::Action(action)]),
		}
	}

	pub fn with_policy(mut self, policy: DefaultPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Switches to the legacy allow-by-default fallback. Avoid for new code.
	pub fn allow_by_default(self) -> Self {
		self.with_policy(DefaultPolicy::AllowByDefault)
	}

	pub fn policy(&self) -> DefaultPolicy {
		self.policy
	}

	pub fn explicit_needs(&self) -> &BTreeSet<Need> {
		&self.needs
	}

	pub async fn needs(&self, engine: &ExpansionEngine) -> Result<BTreeSet<Need>> {
		Ok(engine.expand(self).await?.needs)
	}

	pub async fn excludes(&self, engine: &ExpansionEngine) -> Result<BTreeSet<Need>> {
		Ok(engine.expand(self).await?.excludes)
	}

	pub async fn decide(&self, engine: &ExpansionEngine, identity: &Identity) -> Result<Decision> {
		let decision = engine.expand(self).await?.decide(identity);
		tracing::debug!(permission = %self, ?decision, "permission evaluated");
		Ok(decision)
	}

	pub async fn allows(&self, engine: &ExpansionEngine, identity: &Identity) -> Result<bool> {
		Ok(self.decide(engine, identity).await?.is_allowed())
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let needs: Vec<String> = self.needs.iter().map(ToString::to_string).collect();
		write!(f, "[{}] ({})", needs.join(", "), self.policy)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_constructors() {
		assert_eq!(Permission::action("open").to_string(), "[action:open] (deny)");
		assert_eq!(
			Permission::parameterized("open", 3),
			Permission::for_action("open", Some("3"))
		);
		assert_eq!(
			Permission::for_action("open", None).allow_by_default().policy(),
			DefaultPolicy::AllowByDefault
		);
	}
}
