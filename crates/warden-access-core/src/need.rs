// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Needs: the atomic credentials a permission asks for and an identity provides.
//!
//! A [`Need`] is either *concrete* (a user, a role or a system role), which an
//! identity can hold directly, or an *action* need, which only means something
//! after it has been expanded against the stored grants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::UserId;

/// Separator between action name and argument in an action cache key.
pub const KEY_SEPARATOR: &str = "::";

/// Action granting global bypass. Implicitly part of every permission.
pub const SUPERUSER_ACCESS: &str = "superuser-access";

/// System role held by every caller, signed in or not.
pub const ANY_USER: &str = "any_user";

/// System role held by every signed-in caller.
pub const AUTHENTICATED_USER: &str = "authenticated_user";

/// Rejects empty action names and names containing [`KEY_SEPARATOR`], which
/// would make `action::argument` cache keys ambiguous.
pub fn validate_action_name(name: &str) -> Result<()> {
	if name.trim().is_empty() {
		return Err(CoreError::InvalidActionName {
			name: name.to_string(),
			reason: "name is empty",
		});
	}
	if name.contains(KEY_SEPARATOR) {
		return Err(CoreError::InvalidActionName {
			name: name.to_string(),
			reason: "name contains the '::' key separator",
		});
	}
	Ok(())
}

/// Canonical cache key for an action expansion.
///
/// `action` alone when there is no argument, `action::argument` otherwise.
pub fn action_cache_key(action: &str, argument: Option<&str>) -> String {
	match argument {
		Some(argument) => format!("{action}{KEY_SEPARATOR}{argument}"),
		None => action.to_string(),
	}
}

/// An action, optionally scoped by an argument.
///
/// `argument: None` is the unscoped form; it expands only through wildcard
/// grants. A scoped action expands through wildcard grants and through grants
/// for exactly that argument string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionNeed {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub argument: Option<String>,
}

impl ActionNeed {
	/// The name is not checked here; see [`ActionNeed::validate`].
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			argument: None,
		}
	}

	/// Scope the action to a single argument value. Non-string arguments are
	/// compared by their string form.
	pub fn with_argument(mut self, argument: impl ToString) -> Self {
		self.argument = Some(argument.to_string());
		self
	}

	pub fn superuser() -> Self {
		Self::new(SUPERUSER_ACCESS)
	}

	pub fn is_superuser(&self) -> bool {
		self.name == SUPERUSER_ACCESS && self.argument.is_none()
	}

	pub fn cache_key(&self) -> String {
		action_cache_key(&self.name, self.argument.as_deref())
	}

	/// Fails for names that could collide with another need's cache key.
	pub fn validate(&self) -> Result<()> {
		validate_action_name(&self.name)
	}
}

impl fmt::Display for ActionNeed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.cache_key())
	}
}

/// A checkable credential or capability marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Need {
	User(UserId),
	Role(String),
	SystemRole(String),
	Action(ActionNeed),
}

impl Need {
	pub fn user(id: impl Into<UserId>) -> Self {
		Need::User(id.into())
	}

	pub fn role(name: impl Into<String>) -> Self {
		Need::Role(name.into())
	}

	pub fn system_role(name: impl Into<String>) -> Self {
		Need::SystemRole(name.into())
	}

	pub fn action(name: impl Into<String>) -> Self {
		Need::Action(ActionNeed::new(name))
	}

	pub fn parameterized_action(name: impl Into<String>, argument: impl ToString) -> Self {
		Need::Action(ActionNeed::new(name).with_argument(argument))
	}

	pub fn any_user() -> Self {
		Need::system_role(ANY_USER)
	}

	pub fn authenticated_user() -> Self {
		Need::system_role(AUTHENTICATED_USER)
	}

	/// Whether an identity can hold this need directly.
	pub fn is_concrete(&self) -> bool {
		!matches!(self, Need::Action(_))
	}

	pub fn as_action(&self) -> Option<&ActionNeed> {
		match self {
			Need::Action(action) => Some(action),
			_ => None,
		}
	}
}

impl From<ActionNeed> for Need {
	fn from(action: ActionNeed) -> Self {
		Need::Action(action)
	}
}

impl fmt::Display for Need {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Need::User(id) => write!(f, "user:{id}"),
			Need::Role(name) => write!(f, "role:{name}"),
			Need::SystemRole(name) => write!(f, "system_role:{name}"),
			Need::Action(action) => write!(f, "action:{action}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_cache_key_without_argument() {
		assert_eq!(action_cache_key("read", None), "read");
		assert_eq!(ActionNeed::new("read").cache_key(), "read");
	}

	#[test]
	fn test_cache_key_with_argument() {
		assert_eq!(action_cache_key("edit", Some("1")), "edit::1");
		assert_eq!(ActionNeed::new("edit").with_argument(1).cache_key(), "edit::1");
	}

	#[test]
	fn test_empty_argument_is_not_wildcard() {
		assert_eq!(action_cache_key("edit", Some("")), "edit::");
		assert_ne!(action_cache_key("edit", Some("")), action_cache_key("edit", None));
	}

	#[test]
	fn test_concrete_needs() {
		assert!(Need::user(1).is_concrete());
		assert!(Need::role("admin").is_concrete());
		assert!(Need::any_user().is_concrete());
		assert!(!Need::action("open").is_concrete());
	}

	#[test]
	fn test_separator_in_action_need_rejected() {
		assert!(ActionNeed::new("open").with_argument("a::b").validate().is_ok());
		let nested = ActionNeed::new("open::b");
		assert_eq!(nested.cache_key(), ActionNeed::new("open").with_argument("b").cache_key());
		assert!(matches!(nested.validate(), Err(CoreError::InvalidActionName { .. })));
		assert!(ActionNeed::new("").validate().is_err());
	}

	#[test]
	fn test_superuser_action() {
		assert!(ActionNeed::superuser().is_superuser());
		assert!(!ActionNeed::superuser().with_argument("x").is_superuser());
		assert!(!ActionNeed::new("open").is_superuser());
	}

	#[test]
	fn test_display() {
		assert_eq!(Need::user(3).to_string(), "user:3");
		assert_eq!(Need::role("admin").to_string(), "role:admin");
		assert_eq!(Need::authenticated_user().to_string(), "system_role:authenticated_user");
		assert_eq!(Need::parameterized_action("edit", 2).to_string(), "action:edit::2");
	}

	#[test]
	fn test_need_serde_roundtrip_tagged() {
		let need = Need::parameterized_action("edit", "7");
		let json = serde_json::to_value(&need).unwrap();
		assert_eq!(json["kind"], "action");
		assert_eq!(json["value"]["argument"], "7");
		let back: Need = serde_json::from_value(json).unwrap();
		assert_eq!(back, need);
	}

	proptest! {
		#[test]
		fn cache_key_starts_with_action(
			action in "[a-z][a-z0-9_-]{0,20}",
			argument in proptest::option::of("[a-zA-Z0-9:_-]{0,20}"),
		) {
			let key = action_cache_key(&action, argument.as_deref());
			prop_assert!(key.starts_with(&action));
			prop_assert_eq!(key == action, argument.is_none());
		}
	}
}
