// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Warden action permissions.
//!
//! This crate has no I/O. It defines what the rest of the workspace passes
//! around:
//!
//! - [`Need`]: user, role, system-role or action credential markers
//! - [`Grant`] and [`GrantOwner`]: stored allow/deny rules
//! - [`Registry`]: catalogue of known actions and system roles
//! - [`Identity`]: the concrete needs a caller provides
//! - [`Expansion`] and [`DefaultPolicy`]: resolved needs/excludes and the
//!   decision rule
//! - [`invalidation`]: which cache keys a grant change makes stale
//!
//! # Example
//!
//! ```
//! use warden_access_core::{Expansion, Identity, Need};
//!
//! let mut expansion = Expansion::new();
//! expansion.add(Need::role("opener"), false);
//! expansion.add(Need::user(7), true);
//!
//! let opener = Identity::for_user(3).with(Need::role("opener"));
//! let banned = Identity::for_user(7).with(Need::role("opener"));
//! assert!(expansion.allows(&opener));
//! assert!(!expansion.allows(&banned));
//! ```

pub mod error;
pub mod expansion;
pub mod grant;
pub mod identity;
pub mod invalidation;
pub mod need;
pub mod registry;
pub mod types;

pub use error::{CoreError, Result};
pub use expansion::{Decision, DefaultPolicy, Expansion};
pub use grant::{Grant, GrantFilter, GrantOwner, GrantUpdate, NewGrant};
pub use identity::Identity;
pub use invalidation::StaleKey;
pub use need::{
	action_cache_key, validate_action_name, ActionNeed, Need, ANY_USER, AUTHENTICATED_USER, KEY_SEPARATOR, SUPERUSER_ACCESS,
};
pub use registry::{ActionDescriptor, BuiltinCatalogue, Catalogue, CatalogueProvider, Registry};
pub use types::{GrantId, RoleId, UserId};
