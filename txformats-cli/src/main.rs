mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Guess the i18n method of a localization file.
    Guess {
        /// The file to inspect
        input: String,
    },

    /// Parse a localization file and print the extracted strings as JSON.
    Parse {
        /// The input file to process
        #[arg(short, long)]
        input: String,

        /// i18n method; guessed from the filename when omitted
        #[arg(short, long)]
        method: Option<String>,

        /// Language the file is for
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Treat the file as a source-language file
        #[arg(long)]
        source: bool,
    },

    /// Import a localization file into a JSON store.
    Import {
        /// The input file to process
        #[arg(short, long)]
        input: String,

        /// Path of the JSON store file (created if missing)
        #[arg(short, long)]
        store: String,

        /// Resource slug inside the store
        #[arg(short, long)]
        resource: String,

        /// i18n method; guessed from the filename when omitted
        #[arg(short, long)]
        method: Option<String>,

        /// Language of the file; the resource's source language when omitted
        #[arg(short, long)]
        lang: Option<String>,

        /// Import as the resource's source-language file
        #[arg(long)]
        source: bool,

        /// Leave differing existing translations untouched
        #[arg(long)]
        keep_existing: bool,
    },

    /// Compile a resource's template into a translation file.
    Compile {
        /// Path of the JSON store file
        #[arg(short, long)]
        store: String,

        /// Resource slug inside the store
        #[arg(short, long)]
        resource: String,

        /// Language to compile for; the source language when omitted
        #[arg(short, long)]
        lang: Option<String>,

        /// Write a POT-flavored file (PO resources only)
        #[arg(long)]
        pot: bool,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// The shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = match args.commands {
        Commands::Guess { input } => commands::guess(&input),
        Commands::Parse {
            input,
            method,
            lang,
            source,
        } => commands::parse(&input, method.as_deref(), &lang, source),
        Commands::Import {
            input,
            store,
            resource,
            method,
            lang,
            source,
            keep_existing,
        } => commands::import(
            &input,
            &store,
            &resource,
            method.as_deref(),
            lang.as_deref(),
            source,
            !keep_existing,
        ),
        Commands::Compile {
            store,
            resource,
            lang,
            pot,
            output,
        } => commands::compile(&store, &resource, lang.as_deref(), pot, output.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Args::command(),
                "txformats",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
