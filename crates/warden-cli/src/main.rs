// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `warden`: administer action grants, users and roles.

mod commands;
mod context;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_server_access::AccessError;
use warden_server_config::{load_config, load_config_with_file, WardenConfig};
use warden_server_db::{create_pool, run_migrations};

use commands::{
	handle_access_command, handle_roles_command, handle_users_command, AccessCommands, RolesCommands,
	UsersCommands,
};
use context::CliContext;

/// Exit status for invocations the engine rejects as malformed.
const EXIT_USAGE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Action permission administration")]
struct Cli {
	/// Config file to read instead of the system one
	#[arg(long, global = true, env = "WARDEN_CONFIG")]
	config: Option<PathBuf>,

	/// Override the configured database URL
	#[arg(long, global = true)]
	database_url: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Create or upgrade the database schema
	Migrate,
	/// Manage user accounts
	#[command(subcommand)]
	Users(UsersCommands),
	/// Manage roles and memberships
	#[command(subcommand)]
	Roles(RolesCommands),
	/// Manage and evaluate action grants
	#[command(subcommand)]
	Access(AccessCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	match run(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{} {e:#}", style("error:").red().bold());
			exit_code_for(&e)
		}
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let mut config = match &cli.config {
		Some(path) => load_config_with_file(path)?,
		None => load_config()?,
	};
	if let Some(url) = cli.database_url {
		config.database.url = url;
	}

	init_tracing(&config);
	// Config validation runs before a subscriber exists, so repeat its warning.
	commands::access::warn_on_allow_by_default(config.access.default_policy, "access.default_policy");

	match cli.command {
		Command::Migrate => handle_migrate(&config).await,
		Command::Users(command) => handle_users_command(command, &CliContext::connect(&config).await?).await,
		Command::Roles(command) => handle_roles_command(command, &CliContext::connect(&config).await?).await,
		Command::Access(command) => handle_access_command(command, &CliContext::connect(&config).await?).await,
	}
}

fn init_tracing(config: &WardenConfig) {
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.level.clone().into()))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

async fn handle_migrate(config: &WardenConfig) -> anyhow::Result<()> {
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;
	info!(database = %config.database.url, "schema up to date");
	println!("{} Database schema is up to date", style("✓").green().bold());
	Ok(())
}

fn exit_code_for(error: &anyhow::Error) -> ExitCode {
	match error.downcast_ref::<AccessError>() {
		Some(e) if e.is_usage() => ExitCode::from(EXIT_USAGE),
		_ => ExitCode::FAILURE,
	}
}
