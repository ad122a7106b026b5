use std::io::Read;
use std::path::PathBuf;

use chatmark_core::{
    EmojiStyle, EntityId, RenderContext, SUGGESTION_LIMIT, Selection, decorate_full,
    mention_query, render, suggest_users, to_html, to_plain_text,
};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

mod config;
mod error;

use config::CliConfig;
use error::CliError;

#[derive(Parser)]
#[command(version, about = "chatmark - chat markup decorator and renderer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (JSON or TOML)
    #[arg(long, global = true, env = "CHATMARK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print highlight ranges for a composer buffer as JSON
    Decorate {
        /// Message text; read from stdin when omitted
        text: Option<String>,

        /// Include syntax marker spans
        #[arg(long)]
        spans: bool,
    },
    /// Render finalized message content
    Render {
        /// Message text; read from stdin when omitted
        text: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Directory snapshot for mention lookups (JSON or TOML)
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Server being viewed
        #[arg(long, allow_hyphen_values = true)]
        server: Option<EntityId>,

        /// Channel being viewed
        #[arg(long, allow_hyphen_values = true)]
        channel: Option<EntityId>,

        /// Render as a direct message
        #[arg(long)]
        dm: bool,

        #[arg(long, value_enum)]
        emoji_style: Option<EmojiStyleArg>,

        /// Keep all-emoji messages at text size
        #[arg(long)]
        no_big_emoji: bool,

        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Suggest users for the `@word` before the cursor
    Suggest {
        text: String,

        /// Cursor position in chars; defaults to the end of the text
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long)]
        directory: Option<PathBuf>,

        #[arg(long, default_value_t = SUGGESTION_LIMIT)]
        limit: usize,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Html,
    Text,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmojiStyleArg {
    System,
    Image,
}

impl From<EmojiStyleArg> for EmojiStyle {
    fn from(arg: EmojiStyleArg) -> Self {
        match arg {
            EmojiStyleArg::System => EmojiStyle::System,
            EmojiStyleArg::Image => EmojiStyle::Image,
        }
    }
}

#[derive(Serialize)]
struct SuggestOutput {
    query: Option<chatmark_core::MentionQuery>,
    users: Vec<SuggestedUser>,
}

#[derive(Serialize)]
struct SuggestedUser {
    id: EntityId,
    label: chatmark_core::SmolStr,
}

fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Decorate { text, spans } => {
            let text = input(text)?;
            let decoration = decorate_full(&text);
            let json = if spans {
                serde_json::to_string_pretty(&decoration)
            } else {
                serde_json::to_string_pretty(&decoration.ranges)
            }
            .into_diagnostic()?;
            println!("{json}");
        }
        Commands::Render {
            text,
            format,
            directory,
            server,
            channel,
            dm,
            emoji_style,
            no_big_emoji,
            max_depth,
        } => {
            config.directory = directory.or(config.directory);
            config.server = server.or(config.server);
            config.channel = channel.or(config.channel);
            config.dm |= dm;
            config.emoji_style = emoji_style.map(EmojiStyle::from).or(config.emoji_style);
            config.no_big_emoji |= no_big_emoji;
            config.max_depth = max_depth.or(config.max_depth);

            let text = input(text)?;
            let directory = config.load_directory()?;
            let cx = RenderContext::default()
                .with_directory(&directory)
                .with_scope(config.scope())
                .with_options(config.render_options());
            let nodes = render(&text, &cx);
            tracing::debug!(nodes = nodes.len(), "rendered");

            match format {
                Format::Json => {
                    println!("{}", serde_json::to_string_pretty(&nodes).into_diagnostic()?)
                }
                Format::Html => println!("{}", to_html(&nodes).into_diagnostic()?),
                Format::Text => println!("{}", to_plain_text(&nodes)),
            }
        }
        Commands::Suggest {
            text,
            cursor,
            directory,
            limit,
        } => {
            config.directory = directory.or(config.directory);
            let len = text.chars().count();
            let cursor = cursor.unwrap_or(len);
            if cursor > len {
                return Err(CliError::CursorOutOfRange { cursor, len }.into());
            }

            let directory = config.load_directory()?;
            let query = mention_query(&text, Selection::collapsed(cursor));
            let users = query
                .as_ref()
                .map(|q| suggest_users(directory.users(), &q.query, limit))
                .unwrap_or_default()
                .into_iter()
                .map(|user| SuggestedUser {
                    id: user.id,
                    label: chatmark_core::directory::display_name(user, None),
                })
                .collect();
            let output = SuggestOutput { query, users };
            println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        }
    }

    Ok(())
}

fn input(text: Option<String>) -> Result<String, CliError> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(CliError::Stdin)?;
            // a trailing newline from `echo` is not part of the message
            if buf.ends_with('\n') {
                buf.pop();
                if buf.ends_with('\r') {
                    buf.pop();
                }
            }
            Ok(buf)
        }
    }
}

fn init_tracing() {
    let default = if cfg!(debug_assertions) { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
