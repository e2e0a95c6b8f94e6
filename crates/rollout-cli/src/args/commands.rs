use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List conversations, most recently updated first")]
    List {
        #[arg(long, default_value = "20", help = "Page size (1-100)")]
        limit: usize,

        #[arg(long, help = "Resume token printed by a previous page")]
        cursor: Option<String>,
    },

    #[command(about = "Print the stored items of a session")]
    History { session_id: String },

    #[command(about = "Delete sessions whose retention has passed")]
    Cleanup {
        #[arg(
            long,
            value_name = "SECS",
            help = "Keep running and reap every SECS seconds until interrupted"
        )]
        every: Option<u64>,
    },

    #[command(about = "Delete a session and all of its items")]
    Delete { session_id: String },

    #[command(about = "Write a session as JSONL (one item per line)")]
    Export {
        session_id: String,

        #[arg(long, short, help = "Output file (defaults to stdout)")]
        output: Option<PathBuf>,
    },

    #[command(about = "Create a session from an exported JSONL file")]
    Import {
        path: PathBuf,

        #[arg(long, value_name = "DAYS|permanent", help = "Retention override")]
        ttl_days: Option<String>,
    },

    #[command(about = "Record JSON rollout items read from stdin")]
    Record {
        #[arg(long, help = "Session to append to (created if missing; random if omitted)")]
        id: Option<String>,

        #[arg(long, help = "Instructions stored in a new session's header")]
        instructions: Option<String>,

        #[arg(long, value_name = "DAYS|permanent", help = "Retention for a new session")]
        ttl_days: Option<String>,
    },
}
