// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users, roles and role memberships.
//!
//! These are the owners grants point at. Membership changes never touch the
//! grant cache: an expansion is keyed by action, and role needs are resolved
//! against an identity loaded per request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use warden_access_core::{RoleId, UserId};

use crate::error::{DbError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub email: String,
	pub active: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
	pub id: RoleId,
	pub name: String,
	pub description: Option<String>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
	async fn create_user(&self, email: &str) -> Result<User>;
	async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
	/// Returns `false` if the user does not exist.
	async fn set_user_active(&self, id: UserId, active: bool) -> Result<bool>;

	async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role>;
	async fn get_role_by_id(&self, id: RoleId) -> Result<Option<Role>>;
	async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>>;
	async fn list_roles(&self) -> Result<Vec<Role>>;

	/// Returns `false` if the user already had the role.
	async fn add_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool>;
	/// Returns `false` if the user did not have the role.
	async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool>;
	async fn list_roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>>;
}

#[derive(Clone)]
pub struct AccountRepository {
	pool: SqlitePool,
}

impl AccountRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn unique_as_conflict(err: sqlx::Error, what: impl FnOnce() -> String) -> DbError {
	match &err {
		sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Conflict(what()),
		sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::NotFound(what()),
		_ => DbError::Sqlx(err),
	}
}

#[async_trait]
impl AccountStore for AccountRepository {
	#[instrument(skip(self))]
	async fn create_user(&self, email: &str) -> Result<User> {
		let created_at = Utc::now();
		let result = sqlx::query("INSERT INTO users (email, active, created_at) VALUES (?, 1, ?)")
			.bind(email)
			.bind(created_at.to_rfc3339())
			.execute(&self.pool)
			.await
			.map_err(|e| unique_as_conflict(e, || format!("user {email} already exists")))?;

		Ok(User {
			id: UserId::new(result.last_insert_rowid()),
			email: email.to_string(),
			active: true,
			created_at,
		})
	}

	#[instrument(skip(self), fields(user_id = %id))]
	async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
		let row = sqlx::query_as::<_, UserRow>(
			"SELECT id, email, active, created_at FROM users WHERE id = ?",
		)
		.bind(id.get())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
		let row = sqlx::query_as::<_, UserRow>(
			"SELECT id, email, active, created_at FROM users WHERE email = ?",
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(user_id = %id))]
	async fn set_user_active(&self, id: UserId, active: bool) -> Result<bool> {
		let result = sqlx::query("UPDATE users SET active = ? WHERE id = ?")
			.bind(active)
			.bind(id.get())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, description))]
	async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role> {
		let result = sqlx::query("INSERT INTO roles (name, description) VALUES (?, ?)")
			.bind(name)
			.bind(description)
			.execute(&self.pool)
			.await
			.map_err(|e| unique_as_conflict(e, || format!("role {name} already exists")))?;

		Ok(Role {
			id: RoleId::new(result.last_insert_rowid()),
			name: name.to_string(),
			description: description.map(str::to_string),
		})
	}

	#[instrument(skip(self), fields(role_id = %id))]
	async fn get_role_by_id(&self, id: RoleId) -> Result<Option<Role>> {
		let row = sqlx::query_as::<_, RoleRow>("SELECT id, name, description FROM roles WHERE id = ?")
			.bind(id.get())
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.map(Into::into))
	}

	#[instrument(skip(self))]
	async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
		let row =
			sqlx::query_as::<_, RoleRow>("SELECT id, name, description FROM roles WHERE name = ?")
				.bind(name)
				.fetch_optional(&self.pool)
				.await?;

		Ok(row.map(Into::into))
	}

	#[instrument(skip(self))]
	async fn list_roles(&self) -> Result<Vec<Role>> {
		let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name, description FROM roles ORDER BY name")
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.into_iter().map(Into::into).collect())
	}

	#[instrument(skip(self), fields(user_id = %user_id, role_id = %role_id))]
	async fn add_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
		let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
			.bind(user_id.get())
			.bind(role_id.get())
			.execute(&self.pool)
			.await
			.map_err(|e| unique_as_conflict(e, || format!("user {user_id} or role {role_id}")))?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(user_id = %user_id, role_id = %role_id))]
	async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
			.bind(user_id.get())
			.bind(role_id.get())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(user_id = %user_id))]
	async fn list_roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>> {
		let rows = sqlx::query_as::<_, RoleRow>(
			r#"
			SELECT r.id, r.name, r.description
			FROM roles r
			INNER JOIN user_roles ur ON ur.role_id = r.id
			WHERE ur.user_id = ?
			ORDER BY r.name
			"#,
		)
		.bind(user_id.get())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.into_iter().map(Into::into).collect())
	}
}

#[derive(sqlx::FromRow)]
struct UserRow {
	id: i64,
	email: String,
	active: bool,
	created_at: String,
}

impl TryFrom<UserRow> for User {
	type Error = DbError;

	fn try_from(row: UserRow) -> Result<Self> {
		Ok(User {
			id: UserId::new(row.id),
			email: row.email,
			active: row.active,
			created_at: DateTime::parse_from_rfc3339(&row.created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[derive(sqlx::FromRow)]
struct RoleRow {
	id: i64,
	name: String,
	description: Option<String>,
}

impl From<RoleRow> for Role {
	fn from(row: RoleRow) -> Self {
		Role {
			id: RoleId::new(row.id),
			name: row.name,
			description: row.description,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_access_test_pool;

	async fn repo() -> AccountRepository {
		AccountRepository::new(create_access_test_pool().await.unwrap())
	}

	#[tokio::test]
	async fn test_create_and_lookup_user() {
		let repo = repo().await;
		let user = repo.create_user("alice@example.com").await.unwrap();
		assert!(user.active);

		let by_email = repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
		assert_eq!(by_email.id, user.id);
		let by_id = repo.get_user_by_id(user.id).await.unwrap().unwrap();
		assert_eq!(by_id.email, "alice@example.com");

		assert!(repo.get_user_by_email("nobody@example.com").await.unwrap().is_none());

		assert!(repo.set_user_active(user.id, false).await.unwrap());
		assert!(!repo.get_user_by_id(user.id).await.unwrap().unwrap().active);
		assert!(!repo.set_user_active(UserId::new(999), false).await.unwrap());
	}

	#[tokio::test]
	async fn test_duplicate_user_and_role_conflict() {
		let repo = repo().await;
		repo.create_user("alice@example.com").await.unwrap();
		let err = repo.create_user("alice@example.com").await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));

		repo.create_role("admin", Some("Administrators")).await.unwrap();
		let err = repo.create_role("admin", None).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_role_membership() {
		let repo = repo().await;
		let user = repo.create_user("alice@example.com").await.unwrap();
		let admin = repo.create_role("admin", None).await.unwrap();
		let opener = repo.create_role("opener", Some("May open things")).await.unwrap();

		assert!(repo.add_user_role(user.id, opener.id).await.unwrap());
		assert!(repo.add_user_role(user.id, admin.id).await.unwrap());
		assert!(!repo.add_user_role(user.id, admin.id).await.unwrap());

		let names: Vec<_> = repo
			.list_roles_for_user(user.id)
			.await
			.unwrap()
			.into_iter()
			.map(|r| r.name)
			.collect();
		assert_eq!(names, vec!["admin", "opener"]);

		assert!(repo.remove_user_role(user.id, admin.id).await.unwrap());
		assert!(!repo.remove_user_role(user.id, admin.id).await.unwrap());
		assert_eq!(repo.list_roles_for_user(user.id).await.unwrap(), vec![opener]);
	}

	#[tokio::test]
	async fn test_membership_for_missing_user_is_not_found() {
		let repo = repo().await;
		let role = repo.create_role("admin", None).await.unwrap();
		let err = repo.add_user_role(UserId::new(42), role.id).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
	}

	#[tokio::test]
	async fn test_list_roles_sorted() {
		let repo = repo().await;
		repo.create_role("reader", None).await.unwrap();
		repo.create_role("admin", None).await.unwrap();
		let roles = repo.list_roles().await.unwrap();
		assert_eq!(roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["admin", "reader"]);
		assert_eq!(repo.get_role_by_name("admin").await.unwrap().unwrap().id, roles[0].id);
		assert!(repo.get_role_by_id(RoleId::new(77)).await.unwrap().is_none());
	}
}
