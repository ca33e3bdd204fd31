// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expansion of action needs into concrete needs.
//!
//! Expanding an action `a` (optionally scoped to argument `x`):
//!
//! 1. look up `a` / `a::x` in the cache and return the hit;
//! 2. otherwise query the grant store for wildcard grants of `a` and, when
//!    scoped, grants for exactly `x`;
//! 3. each grant contributes its owner's concrete need, to `excludes` for a
//!    deny grant and to `needs` for an allow grant;
//! 4. store the result under the key and return it.
//!
//! A permission expands every action it names plus the implicit
//! `superuser-access` action, then applies its [`DefaultPolicy`].

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use warden_access_core::{ActionNeed, Expansion, Grant, GrantOwner, Need, Registry};
use warden_server_db::GrantStore;

use crate::cache::ActionCache;
use crate::error::Result;
use crate::permission::Permission;

#[derive(Clone)]
pub struct ExpansionEngine {
	store: Arc<dyn GrantStore>,
	registry: Arc<Registry>,
	cache: Option<ActionCache>,
}

impl ExpansionEngine {
	pub fn new(store: Arc<dyn GrantStore>, registry: Arc<Registry>) -> Self {
		Self {
			store,
			registry,
			cache: None,
		}
	}

	pub fn with_cache(mut self, cache: ActionCache) -> Self {
		self.cache = Some(cache);
		self
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn cache(&self) -> Option<&ActionCache> {
		self.cache.as_ref()
	}

	/// Concrete needs and excludes granted for one action need.
	#[instrument(skip(self), fields(action = %action))]
	pub async fn expand_action(&self, action: &ActionNeed) -> Result<Expansion> {
		action.validate()?;
		let key = action.cache_key();

		if let Some(cache) = &self.cache {
			if let Some(expansion) = cache.get(&key).await {
				debug!(key = %key, "expansion cache hit");
				return Ok(expansion);
			}
			debug!(key = %key, "expansion cache miss");
		}

		let grants = self
			.store
			.query_by_action(&action.name, action.argument.as_deref())
			.await?;

		let mut expansion = Expansion::new();
		for grant in &grants {
			if let Some(need) = self.grant_need(grant) {
				expansion.add(need, grant.exclude);
			}
		}
		debug!(
			key = %key,
			grants = grants.len(),
			needs = expansion.needs.len(),
			excludes = expansion.excludes.len(),
			"expanded action from store"
		);

		if let Some(cache) = &self.cache {
			cache.set(&key, &expansion).await;
		}
		Ok(expansion)
	}

	/// Resolves a whole permission, including the superuser bypass and the
	/// permission's default policy.
	#[instrument(skip(self, permission), fields(policy = %permission.policy()))]
	pub async fn expand(&self, permission: &Permission) -> Result<Expansion> {
		let mut requested = Expansion::new();
		let mut action_needs = Vec::new();

		for need in permission.explicit_needs() {
			match need {
				Need::Action(action) => {
					requested.merge(self.expand_action(action).await?);
					action_needs.push(action.clone());
				}
				concrete => requested.add(concrete.clone(), false),
			}
		}

		let superuser_action = ActionNeed::superuser();
		let superuser = self.expand_action(&superuser_action).await?;
		action_needs.push(superuser_action);

		Ok(permission.policy().combine(requested, superuser, &action_needs))
	}

	fn grant_need(&self, grant: &Grant) -> Option<Need> {
		match &grant.owner {
			GrantOwner::SystemRole { name } => {
				let need = self.registry.system_role(name);
				if need.is_none() {
					warn!(grant_id = %grant.id, system_role = %name, "skipping grant for unregistered system role");
				}
				need
			}
			owner => Some(owner.need()),
		}
	}
}
