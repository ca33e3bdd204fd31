// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Action permissions backed by the grant store.
//!
//! [`AccessService`] ties the pieces together:
//!
//! - [`ExpansionEngine`] turns a [`Permission`] into concrete needs and
//!   excludes, memoized per action through an [`ActionCache`];
//! - [`IdentityLoader`] builds the [`Identity`](warden_access_core::Identity)
//!   a caller provides;
//! - [`AccessAdmin`] creates and removes grants and accounts.
//!
//! Grant writes invalidate the cache through the repository's change
//! listener, so a decision never reflects a grant set older than the last
//! committed change.

pub mod admin;
pub mod cache;
pub mod engine;
pub mod error;
pub mod loader;
pub mod permission;
pub mod service;

pub use admin::{AccessAdmin, GrantListing, OwnerRef};
pub use cache::{ActionCache, CacheBackend, CacheError, MemoryCacheBackend, DEFAULT_CACHE_PREFIX};
pub use engine::ExpansionEngine;
pub use error::{AccessError, Result};
pub use loader::IdentityLoader;
pub use permission::Permission;
pub use service::{AccessOptions, AccessService};
