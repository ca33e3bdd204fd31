// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant persistence.
//!
//! Every mutation runs in its own transaction. Once the transaction has
//! committed, the repository hands the stale cache keys to its
//! [`GrantChangeListener`] as the final step, so a reader that observes the
//! committed row can never repopulate the cache from the old state after the
//! invalidation ran.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

use warden_access_core::invalidation::{keys_for_insert_or_delete, keys_for_update, stale_keys};
use warden_access_core::{
	validate_action_name, Grant, GrantFilter, GrantId, GrantOwner, GrantUpdate, NewGrant, Registry, StaleKey,
};

use crate::error::{map_constraint, DbError, Result};
use crate::listener::{GrantChangeListener, NoopListener};

const SELECT_GRANTS: &str = r#"
	SELECT g.id, g.action, g.argument, g.exclude, g.user_id, g.role_id,
	       r.name AS role_name, g.system_role, g.created_at
	FROM access_grants g
	LEFT JOIN roles r ON r.id = g.role_id
"#;

#[async_trait]
pub trait GrantStore: Send + Sync {
	async fn create_grant(&self, grant: &NewGrant) -> Result<Grant>;

	/// Creates every grant or none of them.
	async fn create_grants(&self, grants: &[NewGrant]) -> Result<Vec<Grant>>;

	async fn get_grant(&self, id: GrantId) -> Result<Option<Grant>>;

	/// Grants that take part in the expansion of `action` scoped to
	/// `argument`.
	///
	/// Without an argument only wildcard grants match. With an argument,
	/// wildcard grants and grants for exactly that argument match.
	async fn query_by_action(&self, action: &str, argument: Option<&str>) -> Result<Vec<Grant>>;

	async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>>;

	async fn update_grant(&self, id: GrantId, update: &GrantUpdate) -> Result<Grant>;

	async fn delete_grant(&self, id: GrantId) -> Result<bool>;

	/// Deletes allow and deny grants of `owner` on `action` whose argument is
	/// exactly `argument` (`None` only matches the wildcard). Returns the
	/// removed grants; removing nothing is not an error.
	async fn delete_matching(
		&self,
		action: &str,
		argument: Option<&str>,
		owner: &GrantOwner,
	) -> Result<Vec<Grant>>;
}

#[derive(Clone)]
pub struct GrantRepository {
	pool: SqlitePool,
	registry: Arc<Registry>,
	listener: Arc<dyn GrantChangeListener>,
}

impl GrantRepository {
	pub fn new(pool: SqlitePool, registry: Arc<Registry>) -> Self {
		Self {
			pool,
			registry,
			listener: Arc::new(NoopListener),
		}
	}

	pub fn with_listener(mut self, listener: Arc<dyn GrantChangeListener>) -> Self {
		self.listener = listener;
		self
	}

	async fn notify(&self, stale: BTreeSet<StaleKey>) {
		tracing::debug!(
			keys = %stale.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
			"grant change committed"
		);
		self.listener.grants_changed(&stale).await;
	}
}

fn owner_columns(owner: &GrantOwner) -> (Option<i64>, Option<i64>, Option<&str>) {
	match owner {
		GrantOwner::User { id } => (Some(id.get()), None, None),
		GrantOwner::Role { id, .. } => (None, Some(id.get()), None),
		GrantOwner::SystemRole { name } => (None, None, Some(name.as_str())),
	}
}

fn describe(action: &str, argument: Option<&str>, exclude: bool, owner: &GrantOwner) -> String {
	let verb = if exclude { "deny" } else { "allow" };
	match argument {
		Some(argument) => format!("{verb} {action}::{argument} for {owner}"),
		None => format!("{verb} {action} for {owner}"),
	}
}

async fn insert_grant(conn: &mut SqliteConnection, grant: &NewGrant) -> Result<GrantId> {
	let (user_id, role_id, system_role) = owner_columns(&grant.owner);
	let result = sqlx::query(
		r#"
		INSERT INTO access_grants (action, argument, exclude, user_id, role_id, system_role, created_at)
		VALUES (?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(&grant.action)
	.bind(grant.argument.as_deref())
	.bind(grant.exclude)
	.bind(user_id)
	.bind(role_id)
	.bind(system_role)
	.bind(Utc::now().to_rfc3339())
	.execute(&mut *conn)
	.await
	.map_err(|e| {
		map_constraint(e, || {
			describe(&grant.action, grant.argument.as_deref(), grant.exclude, &grant.owner)
		})
	})?;

	Ok(GrantId::new(result.last_insert_rowid()))
}

async fn fetch_grant(conn: &mut SqliteConnection, id: GrantId) -> Result<Option<Grant>> {
	let row = sqlx::query_as::<_, GrantRow>(&format!("{SELECT_GRANTS} WHERE g.id = ?"))
		.bind(id.get())
		.fetch_optional(&mut *conn)
		.await?;

	row.map(TryInto::try_into).transpose()
}

async fn fetch_inserted(conn: &mut SqliteConnection, id: GrantId) -> Result<Grant> {
	fetch_grant(conn, id)
		.await?
		.ok_or_else(|| DbError::Internal(format!("grant {id} missing after insert")))
}

#[async_trait]
impl GrantStore for GrantRepository {
	#[instrument(skip(self, grant), fields(action = %grant.action, owner = %grant.owner))]
	async fn create_grant(&self, grant: &NewGrant) -> Result<Grant> {
		grant.validate(&self.registry)?;

		let mut tx = self.pool.begin().await?;
		let id = insert_grant(&mut tx, grant).await?;
		let created = fetch_inserted(&mut tx, id).await?;
		tx.commit().await?;

		self.notify(keys_for_insert_or_delete(&created)).await;
		Ok(created)
	}

	#[instrument(skip(self, grants), fields(count = grants.len()))]
	async fn create_grants(&self, grants: &[NewGrant]) -> Result<Vec<Grant>> {
		if grants.is_empty() {
			return Ok(Vec::new());
		}
		for grant in grants {
			grant.validate(&self.registry)?;
		}

		let mut tx = self.pool.begin().await?;
		let mut created = Vec::with_capacity(grants.len());
		for grant in grants {
			let id = insert_grant(&mut tx, grant).await?;
			created.push(fetch_inserted(&mut tx, id).await?);
		}
		tx.commit().await?;

		let stale = created.iter().flat_map(keys_for_insert_or_delete).collect();
		self.notify(stale).await;
		Ok(created)
	}

	#[instrument(skip(self), fields(grant_id = %id))]
	async fn get_grant(&self, id: GrantId) -> Result<Option<Grant>> {
		let mut conn = self.pool.acquire().await?;
		fetch_grant(&mut conn, id).await
	}

	#[instrument(skip(self))]
	async fn query_by_action(&self, action: &str, argument: Option<&str>) -> Result<Vec<Grant>> {
		// `g.argument = NULL` is never true, so a missing argument leaves only
		// the wildcard branch.
		let rows = sqlx::query_as::<_, GrantRow>(&format!(
			"{SELECT_GRANTS} WHERE g.action = ? AND (g.argument IS NULL OR g.argument = ?) ORDER BY g.id"
		))
		.bind(action)
		.bind(argument)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, filter))]
	async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>> {
		let (user_id, role_id, system_role) = match &filter.owner {
			Some(owner) => owner_columns(owner),
			None => (None, None, None),
		};

		let rows = sqlx::query_as::<_, GrantRow>(&format!(
			r#"{SELECT_GRANTS}
			WHERE (?1 IS NULL OR g.action = ?1)
			  AND (?2 IS NULL OR g.user_id = ?2)
			  AND (?3 IS NULL OR g.role_id = ?3)
			  AND (?4 IS NULL OR g.system_role = ?4)
			ORDER BY g.id"#
		))
		.bind(filter.action.as_deref())
		.bind(user_id)
		.bind(role_id)
		.bind(system_role)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, update), fields(grant_id = %id))]
	async fn update_grant(&self, id: GrantId, update: &GrantUpdate) -> Result<Grant> {
		let mut tx = self.pool.begin().await?;
		let before = fetch_grant(&mut tx, id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("grant {id}")))?;
		let after = update.apply(&before);
		validate_action_name(&after.action)?;
		after.owner.validate(&self.registry)?;

		let (user_id, role_id, system_role) = owner_columns(&after.owner);
		sqlx::query(
			r#"
			UPDATE access_grants
			SET action = ?, argument = ?, exclude = ?, user_id = ?, role_id = ?, system_role = ?
			WHERE id = ?
			"#,
		)
		.bind(&after.action)
		.bind(after.argument.as_deref())
		.bind(after.exclude)
		.bind(user_id)
		.bind(role_id)
		.bind(system_role)
		.bind(id.get())
		.execute(&mut *tx)
		.await
		.map_err(|e| {
			map_constraint(e, || {
				describe(&after.action, after.argument.as_deref(), after.exclude, &after.owner)
			})
		})?;

		let updated = fetch_inserted(&mut tx, id).await?;
		tx.commit().await?;

		self.notify(keys_for_update(&before, &updated)).await;
		Ok(updated)
	}

	#[instrument(skip(self), fields(grant_id = %id))]
	async fn delete_grant(&self, id: GrantId) -> Result<bool> {
		let mut tx = self.pool.begin().await?;
		let Some(existing) = fetch_grant(&mut tx, id).await? else {
			return Ok(false);
		};
		sqlx::query("DELETE FROM access_grants WHERE id = ?")
			.bind(id.get())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		self.notify(keys_for_insert_or_delete(&existing)).await;
		Ok(true)
	}

	#[instrument(skip(self, owner), fields(owner = %owner))]
	async fn delete_matching(
		&self,
		action: &str,
		argument: Option<&str>,
		owner: &GrantOwner,
	) -> Result<Vec<Grant>> {
		let (user_id, role_id, system_role) = owner_columns(owner);

		let mut tx = self.pool.begin().await?;
		let rows = sqlx::query_as::<_, GrantRow>(&format!(
			r#"{SELECT_GRANTS}
			WHERE g.action = ? AND g.argument IS ?
			  AND g.user_id IS ? AND g.role_id IS ? AND g.system_role IS ?
			ORDER BY g.id"#
		))
		.bind(action)
		.bind(argument)
		.bind(user_id)
		.bind(role_id)
		.bind(system_role)
		.fetch_all(&mut *tx)
		.await?;
		let removed = rows
			.into_iter()
			.map(TryInto::try_into)
			.collect::<Result<Vec<Grant>>>()?;

		sqlx::query(
			r#"
			DELETE FROM access_grants
			WHERE action = ? AND argument IS ?
			  AND user_id IS ? AND role_id IS ? AND system_role IS ?
			"#,
		)
		.bind(action)
		.bind(argument)
		.bind(user_id)
		.bind(role_id)
		.bind(system_role)
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		self.notify(stale_keys(action, argument)).await;
		Ok(removed)
	}
}

#[derive(sqlx::FromRow)]
struct GrantRow {
	id: i64,
	action: String,
	argument: Option<String>,
	exclude: bool,
	user_id: Option<i64>,
	role_id: Option<i64>,
	role_name: Option<String>,
	system_role: Option<String>,
	created_at: String,
}

impl TryFrom<GrantRow> for Grant {
	type Error = DbError;

	fn try_from(row: GrantRow) -> Result<Self> {
		let owner = match (row.user_id, row.role_id, row.system_role) {
			(Some(user_id), None, None) => GrantOwner::user(user_id),
			(None, Some(role_id), None) => {
				let name = row
					.role_name
					.ok_or_else(|| DbError::Internal(format!("grant {} references missing role", row.id)))?;
				GrantOwner::role(role_id, name)
			}
			(None, None, Some(name)) => GrantOwner::system_role(name),
			_ => {
				return Err(DbError::Internal(format!(
					"grant {} does not have exactly one owner",
					row.id
				)))
			}
		};

		Ok(Grant {
			id: GrantId::new(row.id),
			action: row.action,
			argument: row.argument,
			exclude: row.exclude,
			owner,
			created_at: DateTime::parse_from_rfc3339(&row.created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}
