// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring of stores, cache, engine, loader and admin into one object.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tracing::info;

use warden_access_core::{Decision, DefaultPolicy, Identity, Registry};
use warden_server_db::{AccountRepository, GrantRepository, GrantStore};

use crate::admin::AccessAdmin;
use crate::cache::{ActionCache, CacheBackend, DEFAULT_CACHE_PREFIX};
use crate::engine::ExpansionEngine;
use crate::error::Result;
use crate::loader::IdentityLoader;
use crate::permission::Permission;

#[derive(Clone)]
pub struct AccessOptions {
	pub default_policy: DefaultPolicy,
	pub load_system_roles: bool,
	/// `None` disables expansion caching.
	pub cache: Option<Arc<dyn CacheBackend>>,
	pub cache_prefix: String,
}

impl Default for AccessOptions {
	fn default() -> Self {
		Self {
			default_policy: DefaultPolicy::DenyByDefault,
			load_system_roles: true,
			cache: None,
			cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
		}
	}
}

#[derive(Clone)]
pub struct AccessService {
	registry: Arc<Registry>,
	grants: Arc<dyn GrantStore>,
	engine: ExpansionEngine,
	loader: IdentityLoader,
	admin: AccessAdmin,
	default_policy: DefaultPolicy,
}

impl AccessService {
	/// Builds the service over `pool`. When a cache backend is configured the
	/// same [`ActionCache`] is read by the engine and invalidated by the grant
	/// repository.
	pub fn new(pool: SqlitePool, registry: Arc<Registry>, options: AccessOptions) -> Self {
		let accounts = Arc::new(AccountRepository::new(pool.clone()));
		let mut grants = GrantRepository::new(pool, registry.clone());

		let cache = options
			.cache
			.map(|backend| ActionCache::new(backend).with_prefix(options.cache_prefix));
		if let Some(cache) = &cache {
			grants = grants.with_listener(Arc::new(cache.clone()));
		}
		let grants: Arc<dyn GrantStore> = Arc::new(grants);

		let mut engine = ExpansionEngine::new(grants.clone(), registry.clone());
		if let Some(cache) = cache {
			engine = engine.with_cache(cache);
		}

		info!(
			default_policy = %options.default_policy,
			cache = engine.cache().is_some(),
			load_system_roles = options.load_system_roles,
			"access service ready"
		);

		Self {
			loader: IdentityLoader::new(accounts.clone(), registry.clone())
				.with_system_roles(options.load_system_roles),
			admin: AccessAdmin::new(accounts, grants.clone(), registry.clone()),
			registry,
			grants,
			engine,
			default_policy: options.default_policy,
		}
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	/// Direct store access for changes the admin surface does not offer.
	/// Writes still invalidate the cache.
	pub fn grants(&self) -> &dyn GrantStore {
		self.grants.as_ref()
	}

	pub fn engine(&self) -> &ExpansionEngine {
		&self.engine
	}

	pub fn loader(&self) -> &IdentityLoader {
		&self.loader
	}

	pub fn admin(&self) -> &AccessAdmin {
		&self.admin
	}

	pub fn default_policy(&self) -> DefaultPolicy {
		self.default_policy
	}

	/// Permission for one action under the configured default policy.
	pub fn permission(&self, action: &str, argument: Option<&str>) -> Permission {
		Permission::for_action(action, argument).with_policy(self.default_policy)
	}

	pub async fn check(&self, identity: &Identity, permission: &Permission) -> Result<Decision> {
		permission.decide(&self.engine, identity).await
	}
}
