// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use warden_access_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Grant already exists: {0}")]
	DuplicateGrant(String),

	#[error(transparent)]
	Access(#[from] CoreError),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Maps a constraint violation on insert/update to a domain error.
pub(crate) fn map_constraint(err: sqlx::Error, what: impl FnOnce() -> String) -> DbError {
	if let sqlx::Error::Database(db) = &err {
		if db.is_unique_violation() {
			return DbError::DuplicateGrant(what());
		}
		if db.is_foreign_key_violation() {
			return DbError::NotFound(format!("owner of {}", what()));
		}
	}
	DbError::Sqlx(err)
}
