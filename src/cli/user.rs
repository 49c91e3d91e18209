//! User CLI commands
//!
//! Manages the users collection and which user is signed in. Signing in
//! only records the user in settings; no credentials are involved.

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::Role;
use crate::services::UserService;
use crate::storage::Storage;

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user
    Add {
        /// Email address
        email: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Role (admin or user)
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// List users
    List,

    /// Edit a user
    Edit {
        /// Email or ID
        user: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Delete a user
    Delete {
        /// Email or ID
        user: String,
    },

    /// Set the signed-in user
    Login {
        /// Email or ID
        user: String,
    },

    /// Clear the signed-in user
    Logout,

    /// Show the signed-in user
    Whoami,
}

fn parse_role(input: &str) -> LedgerResult<Role> {
    Role::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!("Invalid role: '{}'. Valid roles: admin, user", input))
    })
}

/// Handle a user command
pub fn handle_user_command(
    storage: &Storage,
    settings: &mut Settings,
    cmd: UserCommands,
) -> LedgerResult<()> {
    let service = UserService::new(storage);

    match cmd {
        UserCommands::Add { email, name, role } => {
            let role = parse_role(&role)?;
            let display_name = name.unwrap_or_default();
            let user = service.create(&email, &display_name, role)?;
            println!("Created user: {} ({})", user.email, user.role);
            println!("  ID: {}", user.id);
        }

        UserCommands::List => {
            let users = service.list()?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!("{:<12}  {:<30}  {:<20}  {:<5}", "ID", "Email", "Name", "Role");
            println!("{}", "-".repeat(73));
            for user in users {
                let marker = if settings.current_user == Some(user.id) {
                    " *"
                } else {
                    ""
                };
                println!(
                    "{:<12}  {:<30}  {:<20}  {:<5}{}",
                    user.id.to_string(),
                    user.email,
                    user.display_name,
                    user.role.to_string(),
                    marker
                );
            }
        }

        UserCommands::Edit { user, name, role } => {
            let found = service.resolve(&user)?;
            let role = role.as_deref().map(parse_role).transpose()?;
            if name.is_none() && role.is_none() {
                println!("No changes specified.");
                return Ok(());
            }
            let updated = service.update(found.id, name.as_deref(), role)?;
            println!("Updated user: {} ({})", updated.email, updated.role);
        }

        UserCommands::Delete { user } => {
            let found = service.resolve(&user)?;
            let deleted = service.delete(found.id)?;
            if settings.current_user == Some(deleted.id) {
                settings.current_user = None;
                settings.save(storage.paths())?;
            }
            println!("Deleted user: {}", deleted.email);
        }

        UserCommands::Login { user } => {
            let found = service.resolve(&user)?;
            settings.current_user = Some(found.id);
            settings.save(storage.paths())?;
            println!("Signed in as {} ({})", found.email, found.role);
        }

        UserCommands::Logout => {
            settings.current_user = None;
            settings.save(storage.paths())?;
            println!("Signed out.");
        }

        UserCommands::Whoami => match settings.current_user {
            Some(id) => match service.get(id)? {
                Some(user) => println!("{} ({}, {})", user.email, user.display_name, user.role),
                None => println!("Signed-in user {} no longer exists.", id),
            },
            None => println!("Not signed in."),
        },
    }

    Ok(())
}
