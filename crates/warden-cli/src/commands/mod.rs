// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod access;
pub mod roles;
pub mod users;

pub use access::{handle_access_command, AccessCommands};
pub use roles::{handle_roles_command, RolesCommands};
pub use users::{handle_users_command, UsersCommands};
