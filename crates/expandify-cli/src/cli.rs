use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "expandify - A text snippet expansion tool",
    long_about = "expandify watches what you type and replaces registered triggers with snippet content."
)]
pub struct Expandify {
    /// Log at debug level
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new snippet
    Add {
        #[clap(long, short, help = "Text that fires the snippet when typed")]
        trigger: String,

        #[clap(long, short, help = "Display name")]
        name: String,

        #[clap(long, short, help = "Replacement text, or HTML with --rich")]
        content: String,

        #[clap(long, help = "Treat the content as HTML")]
        rich: bool,
    },
    /// Replace the fields of an existing snippet (usage and enabled state are kept)
    Update {
        #[clap(help = "Index shown by `expandify list`")]
        index: usize,

        #[clap(long, short)]
        trigger: String,

        #[clap(long, short)]
        name: String,

        #[clap(long, short)]
        content: String,

        #[clap(long)]
        rich: bool,
    },
    /// Delete a snippet
    Delete {
        #[clap(help = "Index shown by `expandify list`")]
        index: usize,
    },
    /// List all snippets
    List,
    /// Re-enable a disabled snippet
    Enable { index: usize },
    /// Keep a snippet without letting it fire
    Disable { index: usize },
    /// Manage the applications expansion is allowed in
    Apps {
        #[clap(subcommand)]
        action: AppsCommand,
    },
    /// Turn every trigger on or off
    Triggers {
        #[clap(value_enum)]
        state: TriggerState,
    },
    /// Start the background daemon
    Start,
    /// Stop the background daemon
    Stop,
    /// Check the status of the background daemon
    Status,
    // Hidden command used internally to run the daemon worker
    #[clap(hide = true)]
    DaemonWorker,
}

#[derive(Subcommand)]
pub enum AppsCommand {
    /// Show the allowed executables
    List,
    /// Allow an executable (a path or bare file name)
    Add { path: String },
    /// Disallow an executable
    Remove { path: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TriggerState {
    On,
    Off,
}
