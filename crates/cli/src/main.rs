use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;
mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save, search and archive bookmarks from the terminal
#[derive(Parser, Debug)]
#[command(name = "shelfmark")]
#[command(author = "Shelfmark Contributors")]
#[command(version)]
#[command(about = "Simple bookmark manager with readable text and offline archives", long_about = None)]
struct Cli {
    /// Directory holding the database, archives and thumbnails
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bookmark the specified URL
    Add {
        url: String,

        /// Custom title for this bookmark
        #[arg(short, long)]
        title: Option<String>,

        /// Custom excerpt for this bookmark
        #[arg(short, long)]
        excerpt: Option<String>,

        /// Comma-separated tags for this bookmark
        #[arg(short = 'i', long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Save the bookmark without fetching anything
        #[arg(long)]
        offline: bool,

        /// Save the bookmark without creating an offline archive
        #[arg(long)]
        no_archival: bool,
    },

    /// Print saved bookmarks
    #[command(alias = "list")]
    Print {
        /// Indices such as `1 4 7-9`; all bookmarks when omitted
        indices: Vec<String>,

        /// Output data in JSON format
        #[arg(short, long)]
        json: bool,

        /// Only print the index of bookmarks
        #[arg(long)]
        index_only: bool,
    },

    /// Search bookmarks by keyword and tags
    Search {
        keyword: Option<String>,

        /// Only bookmarks carrying this tag; repeat to require several
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Output data in JSON format
        #[arg(short, long)]
        json: bool,

        /// Show the most recently added bookmarks first
        #[arg(long)]
        latest: bool,
    },

    /// Refresh bookmarks from the web and edit their metadata
    Update {
        /// Indices such as `1 4 7-9`; all bookmarks when omitted
        indices: Vec<String>,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New excerpt
        #[arg(short, long)]
        excerpt: Option<String>,

        /// Comma-separated tags; prefix a tag with `-` to remove it
        #[arg(short = 'i', long, value_delimiter = ',', allow_hyphen_values = true)]
        tags: Vec<String>,

        /// Only edit metadata, do not fetch anything
        #[arg(long)]
        offline: bool,

        /// Do not recreate offline archives
        #[arg(long)]
        no_archival: bool,

        /// Keep existing title and excerpt when refreshing content
        #[arg(long)]
        dont_overwrite: bool,

        /// Skip the confirmation prompt when updating all bookmarks
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete bookmarks; the last bookmarks move into the freed indices
    #[command(alias = "rm")]
    Delete {
        /// Indices such as `1 4 7-9`; all bookmarks when omitted
        indices: Vec<String>,

        /// Skip the confirmation prompt when deleting all bookmarks
        #[arg(short, long)]
        yes: bool,
    },

    /// Show a bookmark's readable text or its offline archive
    Open {
        id: i64,

        /// List the archived resources instead of the text
        #[arg(short, long)]
        archive: bool,

        /// With --archive, write this archived resource to stdout
        #[arg(short, long, requires = "archive")]
        resource: Option<String>,
    },

    /// List tags with their bookmark counts
    Tags,

    /// Manage accounts of the web interface
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Generate a shell completion script
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Create an account
    Add {
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// List accounts, optionally filtered by keyword
    #[command(alias = "print")]
    List { keyword: Option<String> },

    /// Remove accounts
    #[command(alias = "rm")]
    Remove {
        #[arg(required = true)]
        usernames: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Completions { shell } = cli.command {
        commands::completions::<Cli>(shell);
        return Ok(());
    }

    if cli.verbose {
        echo::print_banner();
    }

    let mut app = commands::App::open(cli.data_dir, cli.verbose)?;

    match cli.command {
        Command::Add { url, title, excerpt, tags, offline, no_archival } => {
            app.add(commands::AddArgs { url, title, excerpt, tags, offline, no_archival }).await
        }
        Command::Print { indices, json, index_only } => app.print(&indices, json, index_only),
        Command::Search { keyword, tags, json, latest } => {
            app.search(keyword.as_deref().unwrap_or(""), &tags, json, latest)
        }
        Command::Update { indices, title, excerpt, tags, offline, no_archival, dont_overwrite, yes } => {
            app.update(commands::UpdateArgs {
                indices,
                title,
                excerpt,
                tags,
                offline,
                no_archival,
                dont_overwrite,
                yes,
            })
            .await
        }
        Command::Delete { indices, yes } => app.delete(&indices, yes),
        Command::Open { id, archive, resource } => app.open_bookmark(id, archive, resource.as_deref()),
        Command::Tags => app.tags(),
        Command::Account { command } => match command {
            AccountCommand::Add { username, password } => app.add_account(&username, &password),
            AccountCommand::List { keyword } => app.list_accounts(keyword.as_deref().unwrap_or("")),
            AccountCommand::Remove { usernames } => app.remove_accounts(&usernames),
        },
        Command::Completions { .. } => Ok(()),
    }
}
