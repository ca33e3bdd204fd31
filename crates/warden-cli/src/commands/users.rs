// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::Subcommand;
use console::style;
use tracing::instrument;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum UsersCommands {
	/// Create a user account
	Create {
		/// Email address of the new user
		email: String,
	},
}

pub async fn handle_users_command(command: UsersCommands, ctx: &CliContext) -> anyhow::Result<()> {
	match command {
		UsersCommands::Create { email } => handle_create(&email, ctx).await,
	}
}

#[instrument(skip(ctx))]
async fn handle_create(email: &str, ctx: &CliContext) -> anyhow::Result<()> {
	let user = ctx.service.admin().create_user(email).await?;
	println!(
		"{} Created user {} (id {})",
		style("✓").green().bold(),
		style(&user.email).cyan(),
		user.id
	);
	Ok(())
}
