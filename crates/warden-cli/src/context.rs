// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};
use warden_access_core::Registry;
use warden_server_access::{AccessOptions, AccessService, CacheBackend, MemoryCacheBackend};
use warden_server_config::WardenConfig;
use warden_server_db::{create_pool, run_migrations};

/// Everything a command handler needs.
pub struct CliContext {
	pub service: AccessService,
}

impl CliContext {
	/// Opens the database, applies the schema and builds the access service
	/// from the built-in and configured catalogues.
	#[instrument(skip(config), fields(database = %config.database.url))]
	pub async fn connect(config: &WardenConfig) -> anyhow::Result<Self> {
		let pool = create_pool(&config.database.url).await?;
		run_migrations(&pool).await?;

		let registry = Registry::discover(&[&config.catalogue])?;
		debug!(
			actions = registry.actions().count(),
			system_roles = registry.system_roles().count(),
			"registry loaded"
		);

		let cache = if config.cache.enabled {
			let backend = MemoryCacheBackend::new()
				.with_ttl(config.cache.ttl_secs.map(Duration::from_secs))
				.with_max_entries(config.cache.max_entries);
			Some(Arc::new(backend) as Arc<dyn CacheBackend>)
		} else {
			None
		};

		let options = AccessOptions {
			default_policy: config.access.default_policy,
			load_system_roles: config.access.load_system_roles,
			cache,
			cache_prefix: config.access.cache_prefix.clone(),
		};

		Ok(Self {
			service: AccessService::new(pool, Arc::new(registry), options),
		})
	}
}
