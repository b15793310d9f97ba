use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flush the cache, refresh the roster, start the sweep timers, and
    /// serve the query endpoints.
    Run {
        /// Port for the query endpoints (falls back to SP500_PORT, then 5000).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// One-shot roster refresh, then exit.
    Refresh {
        /// Also walk the company-data sweeps, pacing each to its provider's
        /// tick interval.
        #[arg(short, long)]
        sweep: bool,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}
