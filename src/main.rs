use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use family_ledger::cli::{
    handle_account_command, handle_backup_command, handle_category_command, handle_debt_command,
    handle_entry_command, handle_reconcile_command, handle_summary_command,
    handle_transaction_command, handle_transfer_command, handle_user_command,
};
use family_ledger::config::{paths::LedgerPaths, settings::Settings};
use family_ledger::models::ItemKind;
use family_ledger::services::UserService;
use family_ledger::storage::Storage;

#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Personal and family finance ledger",
    long_about = "Family Ledger keeps YER and SAR balances of bank and cash accounts \
                  consistent with recorded income, expenses and transfers, tracks \
                  debts with customers, and makes restorable backups."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger data directory
    Init,

    /// Bank and cash account commands
    #[command(subcommand)]
    Account(family_ledger::cli::AccountCommands),

    /// Income and expense category commands
    #[command(subcommand)]
    Category(family_ledger::cli::CategoryCommands),

    /// Income entries
    #[command(subcommand)]
    Income(family_ledger::cli::EntryCommands),

    /// Expense entries
    #[command(subcommand)]
    Expense(family_ledger::cli::EntryCommands),

    /// Move money between two accounts
    Transfer(family_ledger::cli::TransferArgs),

    /// Transaction commands
    #[command(subcommand, alias = "transaction")]
    Txn(family_ledger::cli::TransactionCommands),

    /// Debt subledger commands
    #[command(subcommand)]
    Debt(family_ledger::cli::DebtCommands),

    /// User commands
    #[command(subcommand)]
    User(family_ledger::cli::UserCommands),

    /// Backup and restore commands
    #[command(subcommand)]
    Backup(family_ledger::cli::BackupCommands),

    /// Show the dashboard summary
    Summary {
        /// SAR to YER rate for this view only
        #[arg(long)]
        rate: Option<String>,
    },

    /// Check balances and links against the transaction history
    Reconcile {
        /// Fix the issues found
        #[arg(long)]
        repair: bool,
    },

    /// Show configuration and paths
    Config {
        /// Set the SAR to YER rate used by total-wealth views
        #[arg(long)]
        set_rate: Option<String>,
        /// Set how many backups to keep
        #[arg(long)]
        set_backup_keep: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LEDGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    // Open storage; interrupted operations are reconciled here
    let storage = Storage::open(paths.clone())?;

    let identity = match settings.current_user {
        Some(id) => UserService::new(&storage).get(id)?.map(|u| u.identity()),
        None => None,
    };

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing ledger at: {}", paths.base_dir().display());
            storage.save_all()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Next steps:");
            println!("  ledger account create-bank <name> --number <number>");
            println!("  ledger category create income <name>");
        }
        Some(Commands::Account(cmd)) => {
            handle_account_command(&storage, cmd)?;
        }
        Some(Commands::Category(cmd)) => {
            handle_category_command(&storage, cmd)?;
        }
        Some(Commands::Income(cmd)) => {
            handle_entry_command(&storage, ItemKind::Income, cmd)?;
        }
        Some(Commands::Expense(cmd)) => {
            handle_entry_command(&storage, ItemKind::Expense, cmd)?;
        }
        Some(Commands::Transfer(args)) => {
            handle_transfer_command(&storage, args)?;
        }
        Some(Commands::Txn(cmd)) => {
            handle_transaction_command(&storage, cmd)?;
        }
        Some(Commands::Debt(cmd)) => {
            handle_debt_command(&storage, cmd)?;
        }
        Some(Commands::User(cmd)) => {
            handle_user_command(&storage, &mut settings, cmd)?;
        }
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&storage, &settings, identity.as_ref(), cmd)?;
        }
        Some(Commands::Summary { rate }) => {
            handle_summary_command(&storage, &settings, rate.as_deref())?;
        }
        Some(Commands::Reconcile { repair }) => {
            handle_reconcile_command(&storage, repair)?;
        }
        Some(Commands::Config {
            set_rate,
            set_backup_keep,
        }) => {
            if set_rate.is_some() || set_backup_keep.is_some() {
                if let Some(rate) = set_rate {
                    settings.sar_to_yer_rate = family_ledger::cli::summary::parse_rate(&rate)?;
                }
                if let Some(keep) = set_backup_keep {
                    settings.backup_retention.keep = keep;
                }
                settings.save(&paths)?;
                println!("Settings saved.");
                println!();
            }

            println!("Family Ledger Configuration");
            println!("===========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  SAR to YER rate: {}", settings.sar_to_yer_rate);
            println!("  Backups kept:    {}", settings.backup_retention.keep);
            println!("  Date format:     {}", settings.date_format);
            match &identity {
                Some(identity) => println!("  Signed in:       {} ({})", identity.user_id, identity.role),
                None => println!("  Signed in:       no"),
            }
        }
        None => {
            println!("Family Ledger - personal and family finance ledger");
            println!();
            println!("Run 'ledger --help' for usage information.");
        }
    }

    Ok(())
}
