// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory databases for tests.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::DbError;
use crate::schema::run_migrations;

/// A single-connection in-memory pool. Every connection to `:memory:` opens a
/// fresh database, so the pool must never recycle or add connections.
pub async fn create_test_pool() -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str("sqlite::memory:")
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect_with(options)
		.await?;
	Ok(pool)
}

/// [`create_test_pool`] with the full schema applied.
pub async fn create_access_test_pool() -> Result<SqlitePool, DbError> {
	let pool = create_test_pool().await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
