// ABOUTME: Operator command-line tool for the Cragbook persistence core
// ABOUTME: Reports storage status, provisions administrators, deletes accounts and purges tokens
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Configuration comes from the same environment variables as the server
//! (`DATABASE_BACKEND`, `DATABASE_URL`, `JWT_SECRET`, ...).
//!
//! Usage:
//! ```bash
//! # Show backend and collection sizes
//! cargo run --bin cragbook-admin -- status
//!
//! # Create an administrator (or promote an existing user with --force)
//! cargo run --bin cragbook-admin -- create-admin --username root --email root@example.com --password secret
//!
//! # Delete a user and everything they own
//! cargo run --bin cragbook-admin -- delete-user 0f5e8a9c-...
//!
//! # Remove token records older than the credential lifetime
//! cargo run --bin cragbook-admin -- purge-tokens
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use cragbook_server::{
    config::environment::ServerConfig,
    config::BackendKind,
    database_plugins::{Dao, Filter, Update},
    logging::LoggingConfig,
    models::User,
    resources::ServerResources,
    services::accounts,
};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "cragbook-admin",
    about = "Cragbook operator tools",
    long_about = "Inspect and maintain the Cragbook store configured through environment variables."
)]
struct AdminArgs {
    #[command(subcommand)]
    command: AdminCommand,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Show backend, connectivity and collection sizes
    Status,

    /// Create an administrator account
    CreateAdmin {
        /// Login name
        #[arg(long)]
        username: String,

        /// Contact address
        #[arg(long)]
        email: String,

        /// Password
        #[arg(long)]
        password: String,

        /// Promote and reset the password if the username already exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a user and every record that references them
    DeleteUser {
        /// User id
        user_id: Uuid,
    },

    /// Delete token records older than the credential lifetime
    PurgeTokens,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = AdminArgs::parse();

    let mut logging = LoggingConfig::from_env();
    if args.verbose {
        logging.level = "debug".into();
    }
    logging.init()?;

    let config = ServerConfig::from_env()?;
    if config.database.backend == BackendKind::Volatile {
        warn!("DATABASE_BACKEND is volatile; changes made here vanish when the command exits");
    }
    let resources = ServerResources::initialize(config).await?;

    match args.command {
        AdminCommand::Status => status_command(&resources).await?,
        AdminCommand::CreateAdmin {
            username,
            email,
            password,
            force,
        } => create_admin_command(&resources, &username, &email, &password, force).await?,
        AdminCommand::DeleteUser { user_id } => delete_user_command(&resources, user_id).await?,
        AdminCommand::PurgeTokens => {
            let removed = resources
                .auth_manager
                .purge_expired(&resources.database)
                .await?;
            info!("Purged {removed} expired token record(s)");
        }
    }

    resources.database.close().await;
    Ok(())
}

async fn status_command(resources: &ServerResources) -> Result<()> {
    let database = &resources.database;
    info!("Backend: {}", database.backend_info());
    info!("Connected: {}", database.is_connected());
    info!("Users: {}", database.users().count(&Filter::All).await?);
    info!("Active token records: {}", database.tokens().count(&Filter::All).await?);
    info!("Locations: {}", database.locations().count(&Filter::All).await?);
    info!("Routes: {}", database.routes().count(&Filter::All).await?);
    info!("Attempts: {}", database.attempts().count(&Filter::All).await?);
    Ok(())
}

async fn create_admin_command(
    resources: &ServerResources,
    username: &str,
    email: &str,
    password: &str,
    force: bool,
) -> Result<()> {
    let users = resources.database.users();
    let password_hash = resources.auth_manager.hash_password(password).await?;

    if let Some(existing) = users.find_one(&Filter::eq("username", username)).await? {
        if !force {
            return Err(anyhow!(
                "User '{username}' already exists; pass --force to promote it"
            ));
        }
        users
            .update_one(
                &Filter::by_id(existing.id),
                &Update::new()
                    .set("is_admin", true)
                    .set("password_hash", password_hash),
                false,
            )
            .await?;
        info!("Promoted existing user '{username}' ({}) to administrator", existing.id);
        return Ok(());
    }

    if users.count(&Filter::eq("email", email)).await? > 0 {
        return Err(anyhow!("Email '{email}' is already registered"));
    }

    let mut admin = User::new(username, email, password_hash);
    admin.is_admin = true;
    let admin = users.create(admin).await?;
    info!("Created administrator '{username}' ({})", admin.id);
    Ok(())
}

async fn delete_user_command(resources: &ServerResources, user_id: Uuid) -> Result<()> {
    let report = accounts::delete_account(&resources.database, user_id).await?;
    for (collection, removed) in &report.removed {
        info!("  {collection}: {removed}");
    }
    if report.user_deleted {
        info!("Deleted user {user_id} and {} dependent record(s)", report.total());
    } else {
        warn!(
            "User {user_id} not found; removed {} orphaned record(s)",
            report.total()
        );
    }
    Ok(())
}
