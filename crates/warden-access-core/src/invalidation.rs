// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Which cached expansions a grant mutation makes stale.
//!
//! A grant with argument `a` only takes part in the expansion keyed
//! `action::a`. A wildcard grant takes part in the unscoped expansion *and* in
//! every scoped expansion of its action, so changing one also stales every
//! `action::*` entry.

use std::collections::BTreeSet;
use std::fmt;

use crate::grant::Grant;
use crate::need::{action_cache_key, KEY_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StaleKey {
	/// A single action cache key.
	Exact(String),
	/// Every scoped key of the named action.
	ActionPrefix(String),
}

impl StaleKey {
	/// Key prefix matched by [`StaleKey::ActionPrefix`].
	pub fn prefix(action: &str) -> String {
		format!("{action}{KEY_SEPARATOR}")
	}
}

impl fmt::Display for StaleKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StaleKey::Exact(key) => write!(f, "{key}"),
			StaleKey::ActionPrefix(action) => write!(f, "{}*", StaleKey::prefix(action)),
		}
	}
}

/// Keys made stale by an (action, argument) pair gaining or losing a grant.
pub fn stale_keys(action: &str, argument: Option<&str>) -> BTreeSet<StaleKey> {
	let mut keys = BTreeSet::new();
	keys.insert(StaleKey::Exact(action_cache_key(action, argument)));
	if argument.is_none() {
		keys.insert(StaleKey::ActionPrefix(action.to_string()));
	}
	keys
}

pub fn keys_for_insert_or_delete(grant: &Grant) -> BTreeSet<StaleKey> {
	stale_keys(&grant.action, grant.argument.as_deref())
}

/// Keys for both the pre-update and post-update (action, argument). An owner
/// or polarity change alone still stales the grant's own key.
pub fn keys_for_update(before: &Grant, after: &Grant) -> BTreeSet<StaleKey> {
	let mut keys = keys_for_insert_or_delete(before);
	keys.extend(keys_for_insert_or_delete(after));
	keys
}
