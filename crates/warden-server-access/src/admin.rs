// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant and account administration.
//!
//! Owners are named the way an operator knows them (user email, role name,
//! system-role name) and resolved to stored ids before anything is written.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

use warden_access_core::{Catalogue, Grant, GrantFilter, GrantOwner, NewGrant, Registry, UserId};
use warden_server_db::{AccountStore, GrantStore, Role, User};

use crate::error::{AccessError, Result};

/// An owner as named on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerRef {
	/// User email.
	User(String),
	/// Role name.
	Role(String),
	/// System-role name.
	SystemRole(String),
}

impl fmt::Display for OwnerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OwnerRef::User(email) => write!(f, "user {email}"),
			OwnerRef::Role(name) => write!(f, "role {name}"),
			OwnerRef::SystemRole(name) => write!(f, "system role {name}"),
		}
	}
}

/// One grant as shown to an operator.
///
/// Renders as `kind:owner:action:argument:allow|deny`, with an empty argument
/// field for wildcard grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantListing {
	pub grant: Grant,
	/// Email, role name or system-role name.
	pub owner_label: String,
}

impl fmt::Display for GrantListing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}:{}:{}:{}:{}",
			self.grant.owner.kind(),
			self.owner_label,
			self.grant.action,
			self.grant.argument.as_deref().unwrap_or(""),
			self.grant.verb()
		)
	}
}

#[derive(Clone)]
pub struct AccessAdmin {
	accounts: Arc<dyn AccountStore>,
	grants: Arc<dyn GrantStore>,
	registry: Arc<Registry>,
}

impl AccessAdmin {
	pub fn new(accounts: Arc<dyn AccountStore>, grants: Arc<dyn GrantStore>, registry: Arc<Registry>) -> Self {
		Self {
			accounts,
			grants,
			registry,
		}
	}

	/// Grants `action` to every owner. All owners are resolved before the
	/// first grant is written, and the grants are created atomically.
	#[instrument(skip(self, owners), fields(owners = owners.len()))]
	pub async fn allow(&self, action: &str, argument: Option<&str>, owners: &[OwnerRef]) -> Result<Vec<Grant>> {
		self.create(action, argument, owners, false).await
	}

	#[instrument(skip(self, owners), fields(owners = owners.len()))]
	pub async fn deny(&self, action: &str, argument: Option<&str>, owners: &[OwnerRef]) -> Result<Vec<Grant>> {
		self.create(action, argument, owners, true).await
	}

	/// Removes allow and deny grants of `action` with exactly `argument` for
	/// each owner. Grants that do not exist are skipped.
	#[instrument(skip(self, owners), fields(owners = owners.len()))]
	pub async fn remove(&self, action: &str, argument: Option<&str>, owners: &[OwnerRef]) -> Result<Vec<Grant>> {
		if owners.is_empty() {
			return Err(AccessError::MissingOwner);
		}
		let resolved = self.resolve_owners(owners).await?;

		let mut removed = Vec::new();
		for owner in &resolved {
			removed.extend(self.grants.delete_matching(action, argument, owner).await?);
		}
		info!(action, argument, removed = removed.len(), "removed grants");
		Ok(removed)
	}

	/// Grants owned by any of `owners`, or every grant when `owners` is empty.
	#[instrument(skip(self, owners), fields(owners = owners.len()))]
	pub async fn show(&self, owners: &[OwnerRef]) -> Result<Vec<GrantListing>> {
		let mut grants = BTreeMap::new();
		if owners.is_empty() {
			for grant in self.grants.list_grants(&GrantFilter::default()).await? {
				grants.insert(grant.id, grant);
			}
		} else {
			for owner in self.resolve_owners(owners).await? {
				for grant in self.grants.list_grants(&GrantFilter::for_owner(owner)).await? {
					grants.insert(grant.id, grant);
				}
			}
		}

		let mut emails: HashMap<UserId, String> = HashMap::new();
		let mut listings = Vec::with_capacity(grants.len());
		for grant in grants.into_values() {
			let owner_label = match &grant.owner {
				GrantOwner::User { id } => match emails.get(id) {
					Some(email) => email.clone(),
					None => {
						let email = self
							.accounts
							.get_user_by_id(*id)
							.await?
							.map(|user| user.email)
							.unwrap_or_else(|| id.to_string());
						emails.insert(*id, email.clone());
						email
					}
				},
				GrantOwner::Role { name, .. } => name.clone(),
				GrantOwner::SystemRole { name } => name.clone(),
			};
			listings.push(GrantListing { grant, owner_label });
		}
		Ok(listings)
	}

	pub fn catalogue(&self) -> Catalogue {
		self.registry.catalogue()
	}

	#[instrument(skip(self))]
	pub async fn create_user(&self, email: &str) -> Result<User> {
		let user = self.accounts.create_user(email).await?;
		info!(user_id = %user.id, email, "created user");
		Ok(user)
	}

	#[instrument(skip(self, description))]
	pub async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role> {
		let role = self.accounts.create_role(name, description).await?;
		info!(role_id = %role.id, name, "created role");
		Ok(role)
	}

	/// Returns `false` if the user already had the role.
	#[instrument(skip(self))]
	pub async fn add_role(&self, email: &str, role: &str) -> Result<bool> {
		let user = self.user(email).await?;
		let role = self.role(role).await?;
		let added = self.accounts.add_user_role(user.id, role.id).await?;
		info!(email, role = %role.name, added, "added role membership");
		Ok(added)
	}

	/// Returns `false` if the user did not have the role.
	#[instrument(skip(self))]
	pub async fn remove_role(&self, email: &str, role: &str) -> Result<bool> {
		let user = self.user(email).await?;
		let role = self.role(role).await?;
		let removed = self.accounts.remove_user_role(user.id, role.id).await?;
		info!(email, role = %role.name, removed, "removed role membership");
		Ok(removed)
	}

	/// Every role, or the roles of one user.
	pub async fn list_roles(&self, email: Option<&str>) -> Result<Vec<Role>> {
		match email {
			Some(email) => {
				let user = self.user(email).await?;
				Ok(self.accounts.list_roles_for_user(user.id).await?)
			}
			None => Ok(self.accounts.list_roles().await?),
		}
	}

	pub async fn resolve_owner(&self, owner: &OwnerRef) -> Result<GrantOwner> {
		match owner {
			OwnerRef::User(email) => Ok(GrantOwner::user(self.user(email).await?.id)),
			OwnerRef::Role(name) => {
				let role = self.role(name).await?;
				Ok(GrantOwner::role(role.id, role.name))
			}
			OwnerRef::SystemRole(name) if self.registry.has_system_role(name) => {
				Ok(GrantOwner::system_role(name.clone()))
			}
			OwnerRef::SystemRole(_) => Err(AccessError::UnknownOwner(owner.to_string())),
		}
	}

	async fn resolve_owners(&self, owners: &[OwnerRef]) -> Result<Vec<GrantOwner>> {
		let mut resolved = Vec::with_capacity(owners.len());
		for owner in owners {
			resolved.push(self.resolve_owner(owner).await?);
		}
		Ok(resolved)
	}

	async fn create(
		&self,
		action: &str,
		argument: Option<&str>,
		owners: &[OwnerRef],
		exclude: bool,
	) -> Result<Vec<Grant>> {
		let descriptor = self
			.registry
			.action(action)
			.ok_or_else(|| AccessError::UnknownAction(action.to_string()))?;
		if argument.is_some() && !descriptor.parameterized {
			return Err(AccessError::ArgumentNotAccepted(action.to_string()));
		}
		if owners.is_empty() {
			return Err(AccessError::MissingOwner);
		}

		let grants: Vec<NewGrant> = self
			.resolve_owners(owners)
			.await?
			.into_iter()
			.map(|owner| NewGrant {
				action: action.to_string(),
				argument: argument.map(str::to_string),
				exclude,
				owner,
			})
			.collect();

		let created = self.grants.create_grants(&grants).await?;
		info!(
			action,
			argument,
			verb = if exclude { "deny" } else { "allow" },
			created = created.len(),
			"created grants"
		);
		Ok(created)
	}

	async fn user(&self, email: &str) -> Result<User> {
		self
			.accounts
			.get_user_by_email(email)
			.await?
			.ok_or_else(|| AccessError::UnknownOwner(format!("user {email}")))
	}

	async fn role(&self, name: &str) -> Result<Role> {
		self
			.accounts
			.get_role_by_name(name)
			.await?
			.ok_or_else(|| AccessError::UnknownOwner(format!("role {name}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_access_core::{ActionDescriptor, ANY_USER};
	use warden_server_db::testing::create_access_test_pool;
	use warden_server_db::{AccountRepository, DbError, GrantRepository};

	async fn admin() -> AccessAdmin {
		let pool = create_access_test_pool().await.unwrap();
		let mut registry = Registry::with_builtins();
		registry.register_action(ActionDescriptor::parameterized("open")).unwrap();
		registry.register_action("admin").unwrap();
		let registry = Arc::new(registry);

		AccessAdmin::new(
			Arc::new(AccountRepository::new(pool.clone())),
			Arc::new(GrantRepository::new(pool, registry.clone())),
			registry,
		)
	}

	#[tokio::test]
	async fn test_allow_and_show() {
		let admin = admin().await;
		admin.create_user("alice@example.com").await.unwrap();
		admin.create_role("opener", None).await.unwrap();

		admin
			.allow(
				"open",
				Some("3"),
				&[OwnerRef::User("alice@example.com".into()), OwnerRef::Role("opener".into())],
			)
			.await
			.unwrap();
		admin
			.deny("admin", None, &[OwnerRef::SystemRole(ANY_USER.into())])
			.await
			.unwrap();

		let lines: Vec<String> = admin.show(&[]).await.unwrap().iter().map(ToString::to_string).collect();
		assert_eq!(
			lines,
			vec![
				"user:alice@example.com:open:3:allow",
				"role:opener:open:3:allow",
				"system_role:any_user:admin::deny",
			]
		);

		let alice = admin.show(&[OwnerRef::User("alice@example.com".into())]).await.unwrap();
		assert_eq!(alice.len(), 1);
	}

	#[tokio::test]
	async fn test_validation_errors() {
		let admin = admin().await;
		admin.create_user("alice@example.com").await.unwrap();
		let alice = [OwnerRef::User("alice@example.com".into())];

		let err = admin.allow("launch", None, &alice).await.unwrap_err();
		assert!(matches!(err, AccessError::UnknownAction(_)));

		let err = admin.allow("admin", Some("1"), &alice).await.unwrap_err();
		assert!(matches!(err, AccessError::ArgumentNotAccepted(_)));

		let err = admin.allow("open", None, &[]).await.unwrap_err();
		assert!(matches!(err, AccessError::MissingOwner));
		assert!(err.is_usage());

		let err = admin
			.allow("open", None, &[OwnerRef::SystemRole("robots".into())])
			.await
			.unwrap_err();
		assert!(matches!(err, AccessError::UnknownOwner(_)));
	}

	#[tokio::test]
	async fn test_unknown_owner_writes_nothing() {
		let admin = admin().await;
		admin.create_user("alice@example.com").await.unwrap();

		let err = admin
			.allow(
				"open",
				None,
				&[OwnerRef::User("alice@example.com".into()), OwnerRef::User("bob@example.com".into())],
			)
			.await
			.unwrap_err();
		assert!(matches!(err, AccessError::UnknownOwner(_)));
		assert!(admin.show(&[]).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_duplicate_grant() {
		let admin = admin().await;
		let owners = [OwnerRef::SystemRole(ANY_USER.into())];
		admin.allow("open", None, &owners).await.unwrap();
		let err = admin.allow("open", None, &owners).await.unwrap_err();
		assert!(matches!(err, AccessError::Db(DbError::DuplicateGrant(_))));
	}

	#[tokio::test]
	async fn test_remove_is_idempotent_and_exact() {
		let admin = admin().await;
		admin.create_role("opener", None).await.unwrap();
		let owners = [OwnerRef::Role("opener".into())];
		admin.allow("open", None, &owners).await.unwrap();
		admin.deny("open", None, &owners).await.unwrap();
		admin.allow("open", Some("1"), &owners).await.unwrap();

		let removed = admin.remove("open", None, &owners).await.unwrap();
		assert_eq!(removed.len(), 2);
		assert!(admin.remove("open", None, &owners).await.unwrap().is_empty());

		let left = admin.show(&owners).await.unwrap();
		assert_eq!(left.len(), 1);
		assert_eq!(left[0].to_string(), "role:opener:open:1:allow");
	}

	#[tokio::test]
	async fn test_role_membership_helpers() {
		let admin = admin().await;
		admin.create_user("alice@example.com").await.unwrap();
		admin.create_role("opener", Some("Opens things")).await.unwrap();
		admin.create_role("reader", None).await.unwrap();

		assert!(admin.add_role("alice@example.com", "opener").await.unwrap());
		assert!(!admin.add_role("alice@example.com", "opener").await.unwrap());
		assert_eq!(admin.list_roles(Some("alice@example.com")).await.unwrap().len(), 1);
		assert_eq!(admin.list_roles(None).await.unwrap().len(), 2);

		assert!(admin.remove_role("alice@example.com", "opener").await.unwrap());
		let err = admin.add_role("alice@example.com", "writer").await.unwrap_err();
		assert!(matches!(err, AccessError::UnknownOwner(_)));
	}

	#[tokio::test]
	async fn test_catalogue_lists_registered_actions() {
		let admin = admin().await;
		let catalogue = admin.catalogue();
		let names: Vec<_> = catalogue.actions.iter().map(|a| a.name.as_str()).collect();
		assert_eq!(names, vec!["admin", "open", "superuser-access"]);
		assert!(catalogue.actions.iter().any(|a| a.name == "open" && a.parameterized));
		assert_eq!(catalogue.system_roles, vec!["any_user", "authenticated_user"]);
	}
}
