// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier newtypes for database-backed records.
//!
//! Users, roles and grants are keyed by SQLite integer row ids. The newtypes
//! keep the three from being mixed up at call sites; all of them serialize
//! transparently as plain integers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from a row id.
			pub fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner row id.
			pub fn get(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user account.");
define_id_type!(RoleId, "Unique identifier for a role.");
define_id_type!(GrantId, "Unique identifier for a stored grant.");
