use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use crewsync_core::{RecordType, WorkerRole};

#[derive(Parser)]
#[command(name = "crewsync")]
#[command(about = "Deliver field survey records to the CRM and watch crews for inactivity")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage worker accounts
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
    /// Clock in, clock out and report activity
    Shift {
        #[command(subcommand)]
        command: ShiftCommands,
    },
    /// Submit a work record for delivery to the CRM
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },
    /// Inspect and process the sync queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Inactivity scans and admin actions
    Inactive {
        #[command(subcommand)]
        command: InactiveCommands,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Run the sync and inactivity services until Ctrl-C
    Run,
}

#[derive(Subcommand)]
pub enum WorkerCommands {
    /// Create a worker account
    Add {
        /// Display name
        name: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Worker)]
        role: RoleArg,
        /// Phone number for SMS escalations
        #[arg(long)]
        phone: Option<String>,
        /// Expo push token for push escalations
        #[arg(long)]
        push_token: Option<String>,
    },
    /// List worker accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a worker account
    Remove {
        /// Worker ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ShiftCommands {
    /// Open a shift
    ClockIn {
        #[arg(long)]
        worker: String,
        /// Keep the shift on this device only
        #[arg(long)]
        local_only: bool,
    },
    /// Close the worker's open shift
    ClockOut {
        #[arg(long)]
        worker: String,
    },
    /// Mark that the worker left the work session while still clocked in
    ExitSession {
        #[arg(long)]
        worker: String,
    },
    /// Record a liveness heartbeat
    Heartbeat {
        #[arg(long)]
        worker: String,
    },
    /// List open shifts
    Open {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// Submit a survey
    Survey {
        #[arg(long)]
        worker: String,
        /// Record fields as a JSON object
        #[arg(long)]
        payload: String,
    },
    /// Submit an appointment
    Appointment {
        #[arg(long)]
        worker: String,
        /// Record fields as a JSON object
        #[arg(long)]
        payload: String,
    },
}

impl RecordCommands {
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Survey { .. } => RecordType::Survey,
            Self::Appointment { .. } => RecordType::Appointment,
        }
    }
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List pending queue items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List permanently failed items
    Failed {
        /// Number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one delivery pass now
    Process,
    /// Show recent delivery statistics
    Stats {
        /// Number of passes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum InactiveCommands {
    /// List clocked-in workers without recent activity
    Scan {
        /// Minutes of inactivity before a worker is flagged
        #[arg(long)]
        threshold: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Close a shift on the worker's behalf
    ForceClockOut {
        /// Shift ID
        shift: String,
        #[arg(long)]
        reason: String,
    },
    /// Record that the worker was contacted manually
    Notify {
        /// Worker ID
        worker: String,
        #[arg(long)]
        reason: String,
    },
    /// Show the inactivity audit log
    Log {
        #[arg(long)]
        worker: Option<String>,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RoleArg {
    Worker,
    Supervisor,
    Admin,
}

impl From<RoleArg> for WorkerRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Worker => Self::Worker,
            RoleArg::Supervisor => Self::Supervisor,
            RoleArg::Admin => Self::Admin,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
