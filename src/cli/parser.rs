use clap::{Parser, Subcommand, ValueEnum};

/// Command-line interface definition for rattendance
/// Volunteer attendance: QR scanning, offline queue and daily reconciliation
#[derive(Parser)]
#[command(
    name = "rattendance",
    version = env!("CARGO_PKG_VERSION"),
    about = "Volunteer attendance tracking: QR check-in/check-out, offline sync and end-of-day review",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Override the offline queue database path
    #[arg(global = true, long = "queue-db")]
    pub queue_db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Verbose diagnostics on stderr (same as RUST_LOG=debug)
    #[arg(global = true, long, short = 'v')]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanMode {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueKind {
    In,
    Out,
    All,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,

        #[arg(long = "migrate", help = "Run configuration file migrations if needed")]
        migrate: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/vim/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
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

        #[arg(long = "last", help = "Only the most recent N rows")]
        last: Option<usize>,
    },

    /// Seed students, events and activities
    Roster {
        #[command(subcommand)]
        action: RosterAction,
    },

    /// Encode or decode a badge QR payload
    Qr {
        #[command(subcommand)]
        action: QrAction,
    },

    /// Check a volunteer in
    CheckIn {
        student: String,
        event: String,
        activity: String,

        #[arg(long = "scanned-by", help = "Operator identity (default: config actor)")]
        scanned_by: Option<String>,

        #[arg(long, help = "Send through the HTTP endpoint, queueing when unreachable")]
        remote: bool,
    },

    /// Check a volunteer out
    CheckOut {
        student: String,
        event: String,

        #[arg(long = "scanned-by", help = "Operator identity (default: config actor)")]
        scanned_by: Option<String>,

        #[arg(long, help = "Send through the HTTP endpoint, queueing when unreachable")]
        remote: bool,
    },

    /// Close one open entry at a given time
    ForceCheckout {
        entry_id: i64,

        #[arg(long = "at", help = "Check-out time (YYYY-MM-DD HH:MM)")]
        at: String,

        #[arg(long)]
        reason: String,

        #[arg(long)]
        remote: bool,
    },

    /// Close every open entry of an event/day at the scheduled end
    ForceAll {
        event: String,

        #[arg(long, help = "Day (YYYY-MM-DD), default today")]
        date: Option<String>,

        #[arg(long, help = "Reason recorded on each entry (default: \"end of day\")")]
        reason: Option<String>,

        #[arg(long)]
        remote: bool,
    },

    /// Correct the times of an entry
    Edit {
        entry_id: i64,

        #[arg(long = "in", help = "New check-in time (YYYY-MM-DD HH:MM)")]
        check_in: Option<String>,

        #[arg(long = "out", help = "New check-out time (YYYY-MM-DD HH:MM)")]
        check_out: Option<String>,

        #[arg(long)]
        reason: String,
    },

    /// List the entries of an event/day
    Entries {
        event: Option<String>,

        #[arg(long, help = "Day (YYYY-MM-DD), default today")]
        date: Option<String>,

        #[arg(long = "changes", value_name = "ENTRY_ID", help = "Show the change log of one entry")]
        changes: Option<i64>,

        #[arg(long, help = "Print as JSON")]
        json: bool,
    },

    /// End-of-day review counters
    Summary {
        event: String,

        #[arg(long, help = "Day (YYYY-MM-DD), default today")]
        date: Option<String>,

        #[arg(long)]
        remote: bool,
    },

    /// Inspect or clear the offline queue
    Queue {
        #[arg(long, help = "List pending intents")]
        list: bool,

        #[arg(long, value_enum, help = "Drop pending intents of a kind")]
        clear: Option<QueueKind>,
    },

    /// Replay the offline queue against the server
    Sync,

    /// Read badges from standard input and check them in or out
    Scan {
        #[arg(long, value_enum, default_value = "in")]
        mode: ScanMode,

        /// Activity recorded on check-in
        #[arg(long)]
        activity: Option<String>,

        /// Only accept badges of this event
        #[arg(long)]
        event: Option<String>,

        #[arg(long = "scanned-by")]
        scanned_by: Option<String>,

        #[arg(long, help = "Send through the HTTP endpoint, queueing when unreachable")]
        remote: bool,
    },

    /// Run the HTTP attendance server
    Serve {
        #[arg(long, help = "Bind address (default: config server.bind)")]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RosterAction {
    /// Import a YAML roster file
    Import { file: String },

    /// Add or rename a student
    Student { id: String, name: String },

    /// Add or update an event with its default hours
    Event {
        id: String,
        name: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Add or update an activity of an event
    Activity {
        event: String,
        id: String,
        name: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Print the roster
    List,
}

#[derive(Subcommand)]
pub enum QrAction {
    /// Print the payload of a badge
    Encode { student: String, event: String },

    /// Validate a scanned payload
    Decode { payload: String },
}
