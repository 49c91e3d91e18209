//! Category CLI commands
//!
//! Implements CLI commands for the income and expense category registries.

use clap::Subcommand;

use crate::display::category::format_category_list;
use crate::error::LedgerResult;
use crate::services::CategoryService;
use crate::storage::Storage;

use super::parse_category_kind;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List the categories of one registry
    List {
        /// Registry (income or expense)
        kind: String,
    },

    /// Create a new category
    Create {
        /// Registry (income or expense)
        kind: String,
        /// Category name
        name: String,
        /// Color (e.g., "#28a745")
        #[arg(short, long)]
        color: Option<String>,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit a category; existing entries keep the old name
    Edit {
        /// Registry (income or expense)
        kind: String,
        /// Category name or ID
        category: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New color
        #[arg(short, long)]
        color: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a category
    Delete {
        /// Registry (income or expense)
        kind: String,
        /// Category name or ID
        category: String,
    },
}

/// Handle a category command
pub fn handle_category_command(storage: &Storage, cmd: CategoryCommands) -> LedgerResult<()> {
    let service = CategoryService::new(storage);

    match cmd {
        CategoryCommands::List { kind } => {
            let kind = parse_category_kind(&kind)?;
            print!("{}", format_category_list(&service.list(kind)?));
        }

        CategoryCommands::Create {
            kind,
            name,
            color,
            description,
        } => {
            let kind = parse_category_kind(&kind)?;
            let category = service.create(
                kind,
                &name,
                color.as_deref(),
                description.as_deref().unwrap_or(""),
            )?;

            println!("Created {} category: {}", kind, category.name);
            println!("  Color: {}", category.color);
            println!("  ID:    {}", category.id);
        }

        CategoryCommands::Edit {
            kind,
            category,
            name,
            color,
            description,
        } => {
            let kind = parse_category_kind(&kind)?;
            let found = service.resolve(kind, &category)?;

            if name.is_none() && color.is_none() && description.is_none() {
                println!("No changes specified.");
                return Ok(());
            }

            let updated = service.update(
                kind,
                found.id,
                name.as_deref(),
                color.as_deref(),
                description.as_deref(),
            )?;
            println!("Updated category: {}", updated.name);
        }

        CategoryCommands::Delete { kind, category } => {
            let kind = parse_category_kind(&kind)?;
            let found = service.resolve(kind, &category)?;
            let deleted = service.delete(kind, found.id)?;
            println!("Deleted category: {}", deleted.name);
        }
    }

    Ok(())
}
