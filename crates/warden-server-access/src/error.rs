// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use warden_access_core::CoreError;
use warden_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
	#[error(transparent)]
	Db(#[from] DbError),

	#[error(transparent)]
	Core(#[from] CoreError),

	#[error("Unknown owner: {0}")]
	UnknownOwner(String),

	#[error("Unknown action: {0}")]
	UnknownAction(String),

	#[error("Action {0} does not take an argument")]
	ArgumentNotAccepted(String),

	#[error("At least one user, role or system role is required")]
	MissingOwner,
}

impl AccessError {
	/// Errors caused by how the caller invoked an operation rather than by the
	/// state of the system.
	pub fn is_usage(&self) -> bool {
		matches!(self, AccessError::MissingOwner)
	}
}

pub type Result<T> = std::result::Result<T, AccessError>;
