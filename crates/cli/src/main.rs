//! Teeshop CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! teeshop-cli migrate
//!
//! # Create an administrator account
//! teeshop-cli admin create -e admin@example.com -n "Admin Name" -p 'secret!' \
//!     --photo-id users/admin --photo-url https://res.cloudinary.com/teeshop/admin.jpg
//!
//! # Seed the catalog from a YAML file
//! teeshop-cli seed catalog.yaml --owner admin@example.com
//! ```
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "teeshop-cli")]
#[command(author, version, about = "Teeshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert catalog items from a YAML file
    Seed {
        /// Path to the YAML catalog
        file: String,

        /// Email of the account recorded as the items' creator
        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new staff account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Role (`admin` or `manager`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Media-host public id of the account photo
        #[arg(long)]
        photo_id: String,

        /// HTTPS URL of the account photo
        #[arg(long)]
        photo_url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                role,
                photo_id,
                photo_url,
            } => {
                let photo = teeshop_core::ImageRef {
                    id: photo_id,
                    secure_url: photo_url,
                };
                commands::admin::create_account(&email, &name, &password, &role, &photo).await?;
            }
        },
        Commands::Seed { file, owner } => {
            commands::seed::catalog(&file, &owner).await?;
        }
    }
    Ok(())
}
