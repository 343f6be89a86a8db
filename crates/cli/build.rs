use std::{env, fs, path::PathBuf};

fn indices() -> clap::Arg {
    clap::arg!([INDICES] ... "Indices such as `1 4 7-9`; all bookmarks when omitted")
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("shelfmark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Shelfmark Contributors")
        .about("Simple bookmark manager with readable text and offline archives")
        .arg(
            clap::arg!(--"data-dir" <DIR> "Directory holding the database, archives and thumbnails")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(
            clap::Command::new("add")
                .about("Bookmark the specified URL")
                .arg(clap::arg!(<URL> "URL to bookmark"))
                .arg(clap::arg!(-t --title <TITLE> "Custom title for this bookmark"))
                .arg(clap::arg!(-e --excerpt <EXCERPT> "Custom excerpt for this bookmark"))
                .arg(clap::arg!(-i --tags <TAGS> "Comma-separated tags for this bookmark"))
                .arg(clap::arg!(--offline "Save the bookmark without fetching anything"))
                .arg(clap::arg!(--"no-archival" "Save the bookmark without creating an offline archive")),
        )
        .subcommand(
            clap::Command::new("print")
                .about("Print saved bookmarks")
                .arg(indices())
                .arg(clap::arg!(-j --json "Output data in JSON format"))
                .arg(clap::arg!(--"index-only" "Only print the index of bookmarks")),
        )
        .subcommand(
            clap::Command::new("search")
                .about("Search bookmarks by keyword and tags")
                .arg(clap::arg!([KEYWORD] "Keyword matched against URL, title and content"))
                .arg(clap::arg!(-t --tag <TAG> ... "Only bookmarks carrying this tag"))
                .arg(clap::arg!(-j --json "Output data in JSON format"))
                .arg(clap::arg!(--latest "Show the most recently added bookmarks first")),
        )
        .subcommand(
            clap::Command::new("update")
                .about("Refresh bookmarks from the web and edit their metadata")
                .arg(indices())
                .arg(clap::arg!(-t --title <TITLE> "New title"))
                .arg(clap::arg!(-e --excerpt <EXCERPT> "New excerpt"))
                .arg(clap::arg!(-i --tags <TAGS> "Comma-separated tags; prefix a tag with `-` to remove it"))
                .arg(clap::arg!(--offline "Only edit metadata, do not fetch anything"))
                .arg(clap::arg!(--"no-archival" "Do not recreate offline archives"))
                .arg(clap::arg!(--"dont-overwrite" "Keep existing title and excerpt when refreshing content"))
                .arg(clap::arg!(-y --yes "Skip the confirmation prompt when updating all bookmarks")),
        )
        .subcommand(
            clap::Command::new("delete")
                .about("Delete bookmarks; the last bookmarks move into the freed indices")
                .arg(indices())
                .arg(clap::arg!(-y --yes "Skip the confirmation prompt when deleting all bookmarks")),
        )
        .subcommand(
            clap::Command::new("open")
                .about("Show a bookmark's readable text or its offline archive")
                .arg(clap::arg!(<ID> "Bookmark index"))
                .arg(clap::arg!(-a --archive "List the archived resources instead of the text"))
                .arg(clap::arg!(-r --resource <NAME> "With --archive, write this archived resource to stdout")),
        )
        .subcommand(clap::Command::new("tags").about("List tags with their bookmark counts"))
        .subcommand(
            clap::Command::new("account")
                .about("Manage accounts of the web interface")
                .subcommand(
                    clap::Command::new("add")
                        .about("Create an account")
                        .arg(clap::arg!(<USERNAME> "Account name"))
                        .arg(clap::arg!(-p --password <PASSWORD> "Account password")),
                )
                .subcommand(
                    clap::Command::new("list")
                        .about("List accounts, optionally filtered by keyword")
                        .arg(clap::arg!([KEYWORD] "Substring of the username")),
                )
                .subcommand(
                    clap::Command::new("remove")
                        .about("Remove accounts")
                        .arg(clap::arg!(<USERNAMES> ... "Accounts to remove")),
                ),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "shelfmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "shelfmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "shelfmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "shelfmark", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
