// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::Subcommand;
use console::style;
use tracing::instrument;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum RolesCommands {
	/// Create a role
	Create {
		name: String,
		/// Human-readable description
		#[arg(short, long)]
		description: Option<String>,
	},
	/// Add a user to a role
	Add {
		/// Email of the user
		email: String,
		/// Role name
		role: String,
	},
	/// Remove a user from a role
	Remove {
		/// Email of the user
		email: String,
		/// Role name
		role: String,
	},
	/// List all roles, or the roles of one user
	List {
		/// Only list roles held by this user
		#[arg(short, long)]
		email: Option<String>,
	},
}

pub async fn handle_roles_command(command: RolesCommands, ctx: &CliContext) -> anyhow::Result<()> {
	match command {
		RolesCommands::Create { name, description } => handle_create(&name, description.as_deref(), ctx).await,
		RolesCommands::Add { email, role } => handle_add(&email, &role, ctx).await,
		RolesCommands::Remove { email, role } => handle_remove(&email, &role, ctx).await,
		RolesCommands::List { email } => handle_list(email.as_deref(), ctx).await,
	}
}

#[instrument(skip(ctx))]
async fn handle_create(name: &str, description: Option<&str>, ctx: &CliContext) -> anyhow::Result<()> {
	let role = ctx.service.admin().create_role(name, description).await?;
	println!("{} Created role {}", style("✓").green().bold(), style(&role.name).cyan());
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_add(email: &str, role: &str, ctx: &CliContext) -> anyhow::Result<()> {
	if ctx.service.admin().add_role(email, role).await? {
		println!(
			"{} Added {} to {}",
			style("✓").green().bold(),
			style(email).cyan(),
			style(role).cyan()
		);
	} else {
		println!("{} {} already has role {}", style("•").dim(), email, role);
	}
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_remove(email: &str, role: &str, ctx: &CliContext) -> anyhow::Result<()> {
	if ctx.service.admin().remove_role(email, role).await? {
		println!(
			"{} Removed {} from {}",
			style("✓").green().bold(),
			style(email).cyan(),
			style(role).cyan()
		);
	} else {
		println!("{} {} does not have role {}", style("•").dim(), email, role);
	}
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_list(email: Option<&str>, ctx: &CliContext) -> anyhow::Result<()> {
	let roles = ctx.service.admin().list_roles(email).await?;
	if roles.is_empty() {
		println!("{}", style("No roles").dim());
		return Ok(());
	}

	for role in roles {
		match role.description {
			Some(description) => println!("{}  {}", style(&role.name).cyan(), style(description).dim()),
			None => println!("{}", style(&role.name).cyan()),
		}
	}
	Ok(())
}
