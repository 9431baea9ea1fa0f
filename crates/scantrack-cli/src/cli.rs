use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use scantrack_core::models::ReadingStatus;

/// Track the manga and webtoons you are reading.
#[derive(Debug, Parser)]
#[command(name = "scantrack", version, about)]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Commands available both from the command line and inside the shell.
///
/// `<SEL>` is a 1-based position in the current view, a record id, or a
/// unique id prefix.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Sign in with Google through the hosted backend.
    Login,
    /// Sign out and forget the stored session.
    Logout,
    /// Show who is signed in and which backend is in use.
    Whoami,
    /// List titles in one status tab.
    #[command(alias = "ls")]
    List(ListArgs),
    /// Add a title.
    Add(AddArgs),
    /// Advance to the next chapter.
    Next { sel: String },
    /// Go back one chapter.
    Prev { sel: String },
    /// Move the chapter by a signed amount.
    Bump {
        sel: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Move a title to another status tab.
    Status { sel: String, status: ReadingStatus },
    /// Delete a title (asks for confirmation).
    #[command(alias = "rm")]
    Delete {
        sel: String,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Open the reading link in the browser.
    Open {
        sel: String,
        /// Print the link instead of opening it.
        #[arg(long)]
        print: bool,
    },
    /// Import a JSON snapshot exported by an older version.
    Import { file: PathBuf },
    /// Write the collection as a JSON snapshot.
    Export {
        /// Destination file (defaults to `my-mangas-v3.json`).
        file: Option<PathBuf>,
    },
    /// Start the interactive shell.
    Shell,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Status tab to show (defaults to the current tab, initially reading).
    #[arg(long, short = 's')]
    pub status: Option<ReadingStatus>,

    /// Only titles containing this text.
    #[arg(long, short = 'q')]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Title as it appears in the catalog.
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,

    /// Chapter you are on.
    #[arg(long, short = 'c')]
    pub chapter: Option<u32>,

    /// Direct link to your reader.
    #[arg(long, short = 'u')]
    pub url: Option<String>,
}

impl AddArgs {
    pub fn title(&self) -> String {
        self.title.join(" ")
    }
}

/// One line typed into the shell.
#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_version_flag = true,
    override_usage = "<command> [args]"
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Switch the status tab.
    Tab { status: ReadingStatus },
    /// Filter by title; no text clears the filter.
    Search { text: Vec<String> },
    /// Open the add form and prompt for a title.
    New,
    /// Re-list from the record store.
    Refresh,
    /// Show recent sync events.
    Log,
    /// Leave the shell.
    #[command(alias = "exit")]
    Quit,
    #[command(flatten)]
    Tracker(Command),
}
