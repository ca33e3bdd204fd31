// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Warden.
//!
//! - [`GrantRepository`] stores allow/deny grants and reports stale cache keys
//!   to a [`GrantChangeListener`] after each committed change.
//! - [`AccountRepository`] stores the users and roles grants are owned by.

pub mod account;
pub mod error;
pub mod grant;
pub mod listener;
pub mod pool;
pub mod schema;
pub mod testing;

pub use account::{AccountRepository, AccountStore, Role, User};
pub use error::{DbError, Result};
pub use grant::{GrantRepository, GrantStore};
pub use listener::{GrantChangeListener, NoopListener};
pub use pool::create_pool;
pub use schema::run_migrations;
