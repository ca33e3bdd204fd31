// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
	#[error("action '{0}' is already registered")]
	DuplicateAction(String),

	#[error("system role '{0}' is already registered")]
	DuplicateSystemRole(String),

	#[error("invalid action name '{name}': {reason}")]
	InvalidActionName { name: String, reason: &'static str },

	#[error("system role '{0}' is not registered")]
	UnregisteredSystemRole(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
