// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema for accounts and grants.
//!
//! Statements are idempotent (`IF NOT EXISTS`) so `run_migrations` can run on
//! every start.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS users (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		email TEXT NOT NULL UNIQUE,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS roles (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		name TEXT NOT NULL UNIQUE,
		description TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS user_roles (
		user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
		role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
		PRIMARY KEY (user_id, role_id)
	)
	"#,
	// Exactly one owner column is set per grant.
	r#"
	CREATE TABLE IF NOT EXISTS access_grants (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		action TEXT NOT NULL,
		argument TEXT,
		exclude INTEGER NOT NULL DEFAULT 0,
		user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
		role_id INTEGER REFERENCES roles(id) ON DELETE CASCADE,
		system_role TEXT,
		created_at TEXT NOT NULL,
		CHECK ((user_id IS NOT NULL) + (role_id IS NOT NULL) + (system_role IS NOT NULL) = 1)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_access_grants_action ON access_grants(action)",
	"CREATE INDEX IF NOT EXISTS idx_access_grants_argument ON access_grants(argument)",
	// NULL arguments/owners compare equal here; a blob never equals a text
	// argument, so X'' cannot collide with a real argument value.
	r#"
	CREATE UNIQUE INDEX IF NOT EXISTS idx_access_grants_unique ON access_grants (
		action,
		exclude,
		IFNULL(argument, X''),
		IFNULL(user_id, 0),
		IFNULL(role_id, 0),
		IFNULL(system_role, '')
	)
	"#,
];

/// Create every table and index used by Warden.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = STATEMENTS.len(), "schema up to date");
	Ok(())
}
