//! `academy`: operator CLI for the academy admin core.
//!
//! Works directly on the embedded redb store named in
//! `~/.academy/config.toml` (or `--db`).

mod commands;
mod output;

use std::path::PathBuf;

use academy_core::{AcademyConfig, Role};
use clap::{Parser, Subcommand};

use commands::context::App;
use output::Output;

/// Academy admin CLI.
#[derive(Parser, Debug)]
#[command(name = "academy", about = "Academy admin CLI")]
struct Cli {
    /// Path to config file (default: ~/.academy/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config.
    #[arg(long = "db", global = true)]
    db: Option<PathBuf>,

    /// Config override as key=value (e.g. loading-timeout-ms=500); repeatable.
    #[arg(long = "setting", global = true)]
    settings: Vec<String>,

    /// Role of the operator: parent, teacher, student, admin or super_admin.
    #[arg(long = "role", global = true, default_value = "admin")]
    role: String,

    /// Output format.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value_t = Output::Table)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a collection with optional search and filters.
    List {
        /// Collection (e.g. employees, complaints, sms).
        collection: String,
        /// Case-insensitive search text.
        #[arg(long)]
        search: Option<String>,
        /// Filter as field=value; repeatable.
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Show one record.
    Get { collection: String, key: String },

    /// Create a record.
    Create {
        collection: String,
        /// Field as field=value; repeatable.
        #[arg(long = "set")]
        set: Vec<String>,
        /// All fields as one JSON object.
        #[arg(long = "json")]
        json_body: Option<String>,
    },

    /// Edit a record; unnamed fields keep their current values.
    Edit {
        collection: String,
        key: String,
        #[arg(long = "set")]
        set: Vec<String>,
        #[arg(long = "json")]
        json_body: Option<String>,
    },

    /// Delete a record.
    Delete {
        collection: String,
        key: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Apply a workflow action (e.g. `transition complaints KEY resolve`).
    Transition {
        collection: String,
        key: String,
        action: String,
        /// Response text stored with resolve/approve/reject.
        #[arg(long)]
        response: Option<String>,
    },

    /// Flip `isActive` on a rule or country.
    Toggle { collection: String, key: String },

    /// Set a student's status.
    #[command(name = "student-status")]
    StudentStatus { key: String, status: String },

    /// Invoice generation.
    Invoices {
        #[command(subcommand)]
        action: InvoiceAction,
    },

    /// Salary generation.
    Salaries {
        #[command(subcommand)]
        action: SalaryAction,
    },

    /// Bulk SMS.
    Sms {
        #[command(subcommand)]
        action: SmsAction,
    },

    /// Show the collections visible to the current role.
    Menu,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum InvoiceAction {
    /// One invoice per family for a month.
    Generate {
        #[arg(long)]
        month: u32,
        #[arg(long)]
        year: i32,
        /// Due date, YYYY-MM-DD.
        #[arg(long)]
        due: String,
        /// Issue date, YYYY-MM-DD (default: today).
        #[arg(long)]
        issue: Option<String>,
        /// Comma-separated family keys (default: all active families).
        #[arg(long, value_delimiter = ',')]
        families: Vec<String>,
        #[arg(long)]
        skip_existing: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SalaryAction {
    /// One salary per active employee for a month.
    Generate {
        #[arg(long)]
        month: u32,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        skip_existing: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SmsAction {
    /// Queue one message per family; `{name}` is replaced by the parent's name.
    Send {
        #[arg(long)]
        message: String,
        #[arg(long, value_delimiter = ',')]
        families: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("academy cli v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let role = Role::from_str(&cli.role)
        .ok_or_else(|| anyhow::anyhow!("Unknown role: {}", cli.role))?;
    let config_path = cli.config.unwrap_or_else(AcademyConfig::default_path);
    let overrides: Vec<String> = cli.settings.iter().map(|s| format!("--{s}")).collect();
    let mut config = AcademyConfig::load(&config_path)?.apply_args(&overrides);
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    let app = App::open(config, role)?;
    let out = cli.output;

    match cli.command {
        Commands::List {
            collection,
            search,
            filters,
        } => {
            commands::records::list(&app, &collection, search.as_deref(), &filters, out).await?;
        }

        Commands::Get { collection, key } => {
            commands::records::get(&app, &collection, &key, out).await?;
        }

        Commands::Create {
            collection,
            set,
            json_body,
        } => {
            let fields = commands::records::parse_fields(&set, json_body.as_deref())?;
            commands::records::create(&app, &collection, fields).await?;
        }

        Commands::Edit {
            collection,
            key,
            set,
            json_body,
        } => {
            let fields = commands::records::parse_fields(&set, json_body.as_deref())?;
            commands::records::edit(&app, &collection, &key, fields).await?;
        }

        Commands::Delete {
            collection,
            key,
            yes,
        } => {
            if !yes {
                eprint!("Delete {collection}/{key}? [y/N]: ");
                let mut s = String::new();
                std::io::stdin().read_line(&mut s)?;
                if !s.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            commands::records::delete(&app, &collection, &key).await?;
        }

        Commands::Transition {
            collection,
            key,
            action,
            response,
        } => {
            commands::workflow::transition(&app, &collection, &key, &action, response).await?;
        }

        Commands::Toggle { collection, key } => {
            commands::workflow::toggle(&app, &collection, &key).await?;
        }

        Commands::StudentStatus { key, status } => {
            commands::workflow::student_status(&app, &key, &status).await?;
        }

        Commands::Invoices {
            action:
                InvoiceAction::Generate {
                    month,
                    year,
                    due,
                    issue,
                    families,
                    skip_existing,
                },
        } => {
            let report = commands::batch::invoices(
                &app,
                month,
                year,
                issue.as_deref(),
                &due,
                &families,
                skip_existing,
            )
            .await?;
            output::print_report(&report, out)?;
        }

        Commands::Salaries {
            action:
                SalaryAction::Generate {
                    month,
                    year,
                    skip_existing,
                },
        } => {
            let report = commands::batch::salaries(&app, month, year, skip_existing).await?;
            output::print_report(&report, out)?;
        }

        Commands::Sms {
            action: SmsAction::Send { message, families },
        } => {
            let report = commands::batch::sms(&app, &message, &families).await?;
            output::print_report(&report, out)?;
        }

        Commands::Menu => {
            for collection in academy::menu_for(role) {
                println!("{:<14} {}", collection.path(), collection.noun());
            }
        }

        Commands::Version => {}
    }

    Ok(())
}
