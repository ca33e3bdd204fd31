// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hook invoked by every grant mutation.
//!
//! The grant repository calls [`GrantChangeListener::grants_changed`] as the
//! last step of each write, after the transaction commits. The cache layer
//! implements it to drop stale expansions; without a cache the repository
//! holds a [`NoopListener`], so the call is made either way.

use async_trait::async_trait;
use std::collections::BTreeSet;
use warden_access_core::StaleKey;

#[async_trait]
pub trait GrantChangeListener: Send + Sync {
	/// Must not fail: implementations log their own errors.
	async fn grants_changed(&self, stale: &BTreeSet<StaleKey>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

#[async_trait]
impl GrantChangeListener for NoopListener {
	async fn grants_changed(&self, stale: &BTreeSet<StaleKey>) {
		tracing::trace!(keys = stale.len(), "no cache configured, nothing to invalidate");
	}
}
