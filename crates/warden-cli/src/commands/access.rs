// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::{Args, Subcommand};
use console::style;
use tracing::{instrument, warn};
use warden_access_core::{Decision, DefaultPolicy, Grant};
use warden_server_access::OwnerRef;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum AccessCommands {
	/// Allow owners to perform an action
	Allow(GrantArgs),
	/// Deny an action to owners, overriding any allow
	Deny(GrantArgs),
	/// Remove allow and deny grants of an action from owners
	Remove(GrantArgs),
	/// Show grants, optionally only those of the given owners
	Show(OwnerArgs),
	/// List registered actions and system roles
	List,
	/// Evaluate a permission for a user, or for an anonymous caller
	Check(CheckArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct OwnerArgs {
	/// User email (repeatable)
	#[arg(short = 'e', long = "email")]
	pub emails: Vec<String>,

	/// Role name (repeatable)
	#[arg(short = 'r', long = "role")]
	pub roles: Vec<String>,

	/// System role name (repeatable)
	#[arg(short = 's', long = "system-role")]
	pub system_roles: Vec<String>,
}

impl OwnerArgs {
	pub fn owners(&self) -> Vec<OwnerRef> {
		self.emails
			.iter()
			.cloned()
			.map(OwnerRef::User)
			.chain(self.roles.iter().cloned().map(OwnerRef::Role))
			.chain(self.system_roles.iter().cloned().map(OwnerRef::SystemRole))
			.collect()
	}
}

#[derive(Debug, Clone, Args)]
pub struct GrantArgs {
	/// Action name
	pub action: String,

	/// Restrict the grant to one argument; omitted means every argument
	#[arg(short, long)]
	pub argument: Option<String>,

	#[command(flatten)]
	pub owners: OwnerArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
	/// Action name
	pub action: String,

	#[arg(short, long)]
	pub argument: Option<String>,

	/// Evaluate as this user; omitted means an anonymous caller
	#[arg(short, long)]
	pub email: Option<String>,

	/// Allow when no grant restricts the action
	#[arg(long)]
	pub allow_by_default: bool,
}

pub async fn handle_access_command(command: AccessCommands, ctx: &CliContext) -> anyhow::Result<()> {
	match command {
		AccessCommands::Allow(args) => handle_allow(args, ctx).await,
		AccessCommands::Deny(args) => handle_deny(args, ctx).await,
		AccessCommands::Remove(args) => handle_remove(args, ctx).await,
		AccessCommands::Show(args) => handle_show(args, ctx).await,
		AccessCommands::List => handle_list(ctx),
		AccessCommands::Check(args) => handle_check(args, ctx).await,
	}
}

#[instrument(skip(ctx))]
async fn handle_allow(args: GrantArgs, ctx: &CliContext) -> anyhow::Result<()> {
	let grants = ctx
		.service
		.admin()
		.allow(&args.action, args.argument.as_deref(), &args.owners.owners())
		.await?;
	print_grants("Allowed", &grants, &args);
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_deny(args: GrantArgs, ctx: &CliContext) -> anyhow::Result<()> {
	let grants = ctx
		.service
		.admin()
		.deny(&args.action, args.argument.as_deref(), &args.owners.owners())
		.await?;
	print_grants("Denied", &grants, &args);
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_remove(args: GrantArgs, ctx: &CliContext) -> anyhow::Result<()> {
	let removed = ctx
		.service
		.admin()
		.remove(&args.action, args.argument.as_deref(), &args.owners.owners())
		.await?;

	if removed.is_empty() {
		println!("{} No matching grants for {}", style("•").dim(), target(&args));
	} else {
		println!(
			"{} Removed {} grant(s) for {}",
			style("✓").green().bold(),
			removed.len(),
			style(target(&args)).cyan()
		);
	}
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_show(args: OwnerArgs, ctx: &CliContext) -> anyhow::Result<()> {
	let listings = ctx.service.admin().show(&args.owners()).await?;
	if listings.is_empty() {
		println!("{}", style("No grants").dim());
		return Ok(());
	}

	for listing in listings {
		let line = listing.to_string();
		if listing.grant.exclude {
			println!("{}", style(line).red());
		} else {
			println!("{line}");
		}
	}
	Ok(())
}

fn handle_list(ctx: &CliContext) -> anyhow::Result<()> {
	let catalogue = ctx.service.admin().catalogue();

	println!("{}", style("Actions").bold());
	for action in &catalogue.actions {
		let name = if action.parameterized {
			format!("{}::<argument>", action.name)
		} else {
			action.name.clone()
		};
		match &action.description {
			Some(description) => println!("  {}  {}", style(name).cyan(), style(description).dim()),
			None => println!("  {}", style(name).cyan()),
		}
	}

	println!("{}", style("System roles").bold());
	for role in &catalogue.system_roles {
		println!("  {}", style(role).cyan());
	}
	Ok(())
}

#[instrument(skip(ctx))]
async fn handle_check(args: CheckArgs, ctx: &CliContext) -> anyhow::Result<()> {
	if !ctx.service.registry().has_action(&args.action) {
		warn!(action = %args.action, "checking an unregistered action");
	}

	let identity = match &args.email {
		Some(email) => ctx.service.loader().load_by_email(email).await?,
		None => ctx.service.loader().anonymous(),
	};

	let mut permission = ctx.service.permission(&args.action, args.argument.as_deref());
	if args.allow_by_default {
		permission = permission.allow_by_default();
	}
	warn_on_allow_by_default(permission.policy(), "access check");

	let decision = ctx.service.check(&identity, &permission).await?;
	let who = args.email.as_deref().unwrap_or("anonymous");
	let what = match &args.argument {
		Some(argument) => format!("{}::{argument}", args.action),
		None => args.action.clone(),
	};

	match decision {
		Decision::Granted(need) => println!(
			"{} {} may {} (granted via {})",
			style("✓").green().bold(),
			who,
			style(what).cyan(),
			need
		),
		Decision::AllowedByDefault => println!(
			"{} {} may {} (allowed by default)",
			style("✓").green().bold(),
			who,
			style(what).cyan()
		),
		Decision::Excluded(need) => println!(
			"{} {} may not {} (denied via {})",
			style("✗").red().bold(),
			who,
			style(what).cyan(),
			need
		),
		Decision::NotGranted => println!(
			"{} {} may not {} (no matching grant)",
			style("✗").red().bold(),
			who,
			style(what).cyan()
		),
	}
	Ok(())
}

/// Logs that allow-by-default is discouraged. Returns whether it warned.
pub(crate) fn warn_on_allow_by_default(policy: DefaultPolicy, origin: &str) -> bool {
	if policy != DefaultPolicy::AllowByDefault {
		return false;
	}
	warn!(
		origin,
		"allow-by-default is discouraged: actions without grants are open to every caller"
	);
	true
}

fn target(args: &GrantArgs) -> String {
	match &args.argument {
		Some(argument) => format!("{}::{argument}", args.action),
		None => args.action.clone(),
	}
}

fn print_grants(verb: &str, grants: &[Grant], args: &GrantArgs) {
	println!(
		"{} {verb} {} for {} owner(s)",
		style("✓").green().bold(),
		style(target(args)).cyan(),
		grants.len()
	);
	for owner in args.owners.owners() {
		println!("  {owner}");
	}
}
