// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds identities from account data.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use warden_access_core::{Identity, Need, Registry, UserId, ANY_USER, AUTHENTICATED_USER};
use warden_server_db::{AccountStore, User};

use crate::error::{AccessError, Result};

/// Loads the concrete needs a caller provides: their user need, one role need
/// per membership and, when enabled, the `any_user` / `authenticated_user`
/// system roles.
#[derive(Clone)]
pub struct IdentityLoader {
	accounts: Arc<dyn AccountStore>,
	registry: Arc<Registry>,
	load_system_roles: bool,
}

impl IdentityLoader {
	pub fn new(accounts: Arc<dyn AccountStore>, registry: Arc<Registry>) -> Self {
		Self {
			accounts,
			registry,
			load_system_roles: true,
		}
	}

	pub fn with_system_roles(mut self, enabled: bool) -> Self {
		self.load_system_roles = enabled;
		self
	}

	/// Identity of a caller that has not signed in.
	pub fn anonymous(&self) -> Identity {
		let mut identity = Identity::new();
		self.add_system_role(&mut identity, ANY_USER);
		identity
	}

	#[instrument(skip(self), fields(user_id = %user_id))]
	pub async fn load_user(&self, user_id: UserId) -> Result<Identity> {
		let user = self
			.accounts
			.get_user_by_id(user_id)
			.await?
			.ok_or_else(|| AccessError::UnknownOwner(format!("user {user_id}")))?;
		self.load(&user).await
	}

	#[instrument(skip(self))]
	pub async fn load_by_email(&self, email: &str) -> Result<Identity> {
		let user = self
			.accounts
			.get_user_by_email(email)
			.await?
			.ok_or_else(|| AccessError::UnknownOwner(format!("user {email}")))?;
		self.load(&user).await
	}

	async fn load(&self, user: &User) -> Result<Identity> {
		// A deactivated account keeps its rows but signs in as nobody.
		if !user.active {
			warn!(user_id = %user.id, "loading identity for inactive user as anonymous");
			return Ok(self.anonymous());
		}

		let mut identity = Identity::for_user(user.id);
		for role in self.accounts.list_roles_for_user(user.id).await? {
			identity.provide(Need::role(role.name));
		}
		self.add_system_role(&mut identity, ANY_USER);
		self.add_system_role(&mut identity, AUTHENTICATED_USER);

		debug!(user_id = %user.id, needs = identity.len(), "identity loaded");
		Ok(identity)
	}

	fn add_system_role(&self, identity: &mut Identity, name: &str) {
		if !self.load_system_roles {
			return;
		}
		if let Some(need) = self.registry.system_role(name) {
			identity.provide(need);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_server_db::testing::create_access_test_pool;
	use warden_server_db::AccountRepository;

	async fn setup() -> (IdentityLoader, Arc<AccountRepository>) {
		let pool = create_access_test_pool().await.unwrap();
		let accounts = Arc::new(AccountRepository::new(pool));
		let loader = IdentityLoader::new(accounts.clone(), Arc::new(Registry::with_builtins()));
		(loader, accounts)
	}

	#[tokio::test]
	async fn test_anonymous_identity() {
		let (loader, _) = setup().await;
		let identity = loader.anonymous();
		assert!(identity.holds(&Need::any_user()));
		assert!(!identity.holds(&Need::authenticated_user()));
		assert_eq!(identity.user_id(), None);

		assert!(loader.with_system_roles(false).anonymous().is_empty());
	}

	#[tokio::test]
	async fn test_load_user_with_roles() {
		let (loader, accounts) = setup().await;
		let user = accounts.create_user("alice@example.com").await.unwrap();
		let role = accounts.create_role("opener", None).await.unwrap();
		accounts.add_user_role(user.id, role.id).await.unwrap();

		let identity = loader.load_user(user.id).await.unwrap();
		assert!(identity.holds(&Need::user(user.id)));
		assert!(identity.holds(&Need::role("opener")));
		assert!(identity.holds(&Need::any_user()));
		assert!(identity.holds(&Need::authenticated_user()));
		assert_eq!(identity.len(), 4);

		let by_email = loader.load_by_email("alice@example.com").await.unwrap();
		assert_eq!(by_email, identity);
	}

	#[tokio::test]
	async fn test_system_roles_can_be_disabled() {
		let (loader, accounts) = setup().await;
		let user = accounts.create_user("alice@example.com").await.unwrap();
		let identity = loader.with_system_roles(false).load_user(user.id).await.unwrap();
		assert_eq!(identity.provides().cloned().collect::<Vec<_>>(), vec![Need::user(user.id)]);
	}

	#[tokio::test]
	async fn test_inactive_user_is_anonymous() {
		let (loader, accounts) = setup().await;
		let user = accounts.create_user("gone@example.com").await.unwrap();
		assert!(accounts.set_user_active(user.id, false).await.unwrap());

		let identity = loader.load_user(user.id).await.unwrap();
		assert!(!identity.holds(&Need::user(user.id)));
		assert_eq!(identity, loader.anonymous());
	}

	#[tokio::test]
	async fn test_unknown_user() {
		let (loader, _) = setup().await;
		let err = loader.load_user(UserId::new(9)).await.unwrap_err();
		assert!(matches!(err, AccessError::UnknownOwner(_)));
	}
}
