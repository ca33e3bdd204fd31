// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expansion cache.
//!
//! [`ActionCache`] stores one JSON-encoded [`Expansion`] per action cache key
//! in a string-valued [`CacheBackend`]. The cache is advisory: backend and
//! encoding failures are logged and read as a miss, so the engine falls back
//! to the grant store and a broken cache can never change a decision.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use warden_access_core::{Expansion, StaleKey};
use warden_server_db::GrantChangeListener;

/// Prefix the expansion cache stores its keys under by default.
pub const DEFAULT_CACHE_PREFIX: &str = "Permission::action::";

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
	#[error("Cache backend error: {0}")]
	Backend(String),

	#[error("Cache serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// String key/value store used for cached expansions.
#[async_trait]
pub trait CacheBackend: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
	async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
	async fn delete(&self, key: &str) -> Result<(), CacheError>;
	/// Removes every key starting with `prefix`, returning how many went.
	async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
	value: String,
	expires_at: Option<Instant>,
	last_used: u64,
}

#[derive(Debug, Default)]
struct Entries {
	map: HashMap<String, CacheEntry>,
	clock: u64,
}

impl Entries {
	fn tick(&mut self) -> u64 {
		self.clock += 1;
		self.clock
	}

	fn evict_lru(&mut self) {
		if let Some(oldest) = self
			.map
			.iter()
			.min_by_key(|(_, entry)| entry.last_used)
			.map(|(key, _)| key.clone())
		{
			self.map.remove(&oldest);
		}
	}
}

/// In-process backend with optional expiry and least-recently-used eviction.
#[derive(Debug)]
pub struct MemoryCacheBackend {
	entries: RwLock<Entries>,
	ttl: Option<Duration>,
	max_entries: usize,
}

impl Default for MemoryCacheBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryCacheBackend {
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(Entries::default()),
			ttl: None,
			max_entries: DEFAULT_MAX_ENTRIES,
		}
	}

	pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
		self.ttl = ttl;
		self
	}

	pub fn with_max_entries(mut self, max_entries: usize) -> Self {
		self.max_entries = max_entries.max(1);
		self
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.map.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	pub async fn cleanup_expired(&self) {
		let now = Instant::now();
		self
			.entries
			.write()
			.await
			.map
			.retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
	}
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
	async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
		let mut entries = self.entries.write().await;
		let tick = entries.tick();
		let now = Instant::now();

		let expired = match entries.map.get_mut(key) {
			Some(entry) if entry.expires_at.map_or(true, |at| at > now) => {
				entry.last_used = tick;
				return Ok(Some(entry.value.clone()));
			}
			Some(_) => true,
			None => false,
		};
		if expired {
			entries.map.remove(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
		let mut entries = self.entries.write().await;
		let tick = entries.tick();

		if !entries.map.contains_key(key) && entries.map.len() >= self.max_entries {
			entries.evict_lru();
		}
		entries.map.insert(
			key.to_string(),
			CacheEntry {
				value,
				expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
				last_used: tick,
			},
		);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), CacheError> {
		self.entries.write().await.map.remove(key);
		Ok(())
	}

	async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
		let mut entries = self.entries.write().await;
		let before = entries.map.len();
		entries.map.retain(|key, _| !key.starts_with(prefix));
		Ok(before - entries.map.len())
	}
}

/// Typed view over a [`CacheBackend`] holding expansions.
#[derive(Clone)]
pub struct ActionCache {
	backend: Arc<dyn CacheBackend>,
	prefix: String,
}

impl ActionCache {
	pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
		Self {
			backend,
			prefix: DEFAULT_CACHE_PREFIX.to_string(),
		}
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	fn backend_key(&self, key: &str) -> String {
		format!("{}{key}", self.prefix)
	}

	/// Cached expansion for an action cache key. Any failure reads as a miss.
	pub async fn get(&self, key: &str) -> Option<Expansion> {
		let backend_key = self.backend_key(key);
		let raw = match self.backend.get(&backend_key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => return None,
			Err(e) => {
				warn!(key = %backend_key, error = %e, "cache read failed, falling back to store");
				return None;
			}
		};

		match serde_json::from_str(&raw) {
			Ok(expansion) => Some(expansion),
			Err(e) => {
				warn!(key = %backend_key, error = %e, "discarding undecodable cache entry");
				if let Err(e) = self.backend.delete(&backend_key).await {
					warn!(key = %backend_key, error = %e, "cache delete failed");
				}
				None
			}
		}
	}

	pub async fn set(&self, key: &str, expansion: &Expansion) {
		let backend_key = self.backend_key(key);
		let result = match serde_json::to_string(expansion) {
			Ok(raw) => self.backend.set(&backend_key, raw).await,
			Err(e) => Err(CacheError::from(e)),
		};
		if let Err(e) = result {
			warn!(key = %backend_key, error = %e, "cache write skipped");
		}
	}

	/// Drops every entry in `stale`. Safe to call repeatedly.
	pub async fn invalidate(&self, stale: &BTreeSet<StaleKey>) {
		for key in stale {
			let result = match key {
				StaleKey::Exact(key) => self.backend.delete(&self.backend_key(key)).await.map(|_| 1),
				StaleKey::ActionPrefix(action) => {
					self
						.backend
						.delete_prefix(&self.backend_key(&StaleKey::prefix(action)))
						.await
				}
			};
			match result {
				Ok(removed) => debug!(key = %key, removed, "invalidated cached expansion"),
				Err(e) => warn!(key = %key, error = %e, "cache invalidation failed"),
			}
		}
	}
}

#[async_trait]
impl GrantChangeListener for ActionCache {
	async fn grants_changed(&self, stale: &BTreeSet<StaleKey>) {
		self.invalidate(stale).await;
	}
}
