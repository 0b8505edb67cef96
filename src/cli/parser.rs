use crate::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Command-line interface definition for staffclock
#[derive(Parser)]
#[command(
    name = "staffclock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Staff attendance tracker: geofenced clock-in/out API with SQLite storage",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Run the HTTP API server
    Serve {
        #[arg(long, value_name = "ADDR", help = "Bind address, e.g. 127.0.0.1:8080")]
        bind: Option<String>,
    },

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(long = "editor", help = "Editor to use with --edit")]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// List users or set a user's role
    User {
        #[arg(long, help = "List all users")]
        list: bool,

        #[arg(long, requires = "role", help = "Email of the user to update")]
        email: Option<String>,

        #[arg(long, requires = "email", help = "New role: worker, manager or admin")]
        role: Option<String>,
    },

    /// List perimeters or check a coordinate against them
    Perimeter {
        #[arg(long, help = "List all perimeters")]
        list: bool,

        #[arg(long, requires = "lon", allow_hyphen_values = true, help = "Latitude to check")]
        lat: Option<String>,

        #[arg(long, requires = "lat", allow_hyphen_values = true, help = "Longitude to check")]
        lon: Option<String>,
    },

    /// Print attendance aggregates for a window
    Dashboard {
        #[arg(long, help = "Window length in days ending at --to (default 7)")]
        days: Option<String>,

        #[arg(long, help = "Window start (YYYY-MM-DD or RFC 3339)")]
        from: Option<String>,

        #[arg(long, help = "Window end (YYYY-MM-DD or RFC 3339, default now)")]
        to: Option<String>,
    },

    /// Export clock records
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(
            long,
            value_name = "RANGE",
            help = "Filter by year/month/day or a START:END range"
        )]
        range: Option<String>,

        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Create a backup copy of the database
    Backup {
        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long)]
        compress: bool,

        #[arg(long, short = 'f', help = "Overwrite an existing file without asking")]
        force: bool,
    },
}
