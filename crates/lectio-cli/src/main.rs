use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lectio_core::{
    ColorGroups, DayKey, HighlightColor, HighlightId, HighlightStore, HtmlTree, MemoryPassages,
    NewHighlight, NewReflection, OverlapPolicy, Passage, PassOptions, PassReport, PassageProvider,
    ReadingSession, ReflectionStore,
};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod passage;
mod store;

use config::LectioConfig;
use passage::HttpPassageProvider;
use store::JsonFileStore;

#[derive(Parser)]
#[command(version, about = "Lectio - daily passage highlights from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the JSON record store
    #[arg(long, env = "LECTIO_STORE", global = true)]
    store: Option<PathBuf>,

    /// Passage endpoint
    #[arg(long, env = "LECTIO_PASSAGE_URL", global = true)]
    passage_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a passage with its stored highlights as HTML
    Render {
        /// Day key (MM-DD); defaults to today
        #[arg(long)]
        day: Option<String>,

        /// Read passage markup from a file instead of the endpoint
        #[arg(long)]
        file: Option<PathBuf>,

        /// How highlights bind when their text is already marked
        #[arg(long, value_enum, default_value_t = Overlap::Clip)]
        overlap: Overlap,

        /// Print the pass report as JSON instead of the HTML
        #[arg(long)]
        report: bool,
    },
    /// Fetch a passage and print it as JSON
    Fetch {
        #[arg(long)]
        day: Option<String>,
    },
    /// Manage highlights
    #[command(subcommand)]
    Highlight(HighlightCommand),
    /// Manage reflections
    #[command(subcommand)]
    Reflect(ReflectCommand),
}

#[derive(Subcommand)]
enum HighlightCommand {
    /// Store a highlight for a day
    Add {
        /// Text to highlight
        text: String,

        #[arg(long, short)]
        color: HighlightColor,

        #[arg(long)]
        day: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },
    /// List a day's highlights grouped by color
    List {
        #[arg(long)]
        day: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Delete a highlight by id
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum ReflectCommand {
    /// Store a reflection for a day
    Add {
        text: String,

        #[arg(long)]
        day: Option<String>,
    },
    /// List a day's reflections
    List {
        #[arg(long)]
        day: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Overlap {
    /// First occurrence in the full text, already-marked parts skipped
    Clip,
    /// First occurrence outside existing markers
    Next,
}

impl From<Overlap> for OverlapPolicy {
    fn from(overlap: Overlap) -> Self {
        match overlap {
            Overlap::Clip => OverlapPolicy::ClipToUnmarked,
            Overlap::Next => OverlapPolicy::NextUnmarked,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();
    let config = LectioConfig::from_env()?.with_overrides(cli.store, cli.passage_url)?;
    tracing::debug!(store = %config.store_path.display(), url = %config.passage_url, "config loaded");

    let store = JsonFileStore::new(&config.store_path);

    match cli.command {
        Commands::Render {
            day,
            file,
            overlap,
            report,
        } => {
            let day = parse_day(day)?;
            let options = PassOptions {
                overlap: overlap.into(),
            };
            let (html, pass) = match file {
                Some(file) => {
                    let markup = tokio::fs::read_to_string(&file).await.into_diagnostic()?;
                    let day = day.unwrap_or_else(DayKey::today);
                    let passages = MemoryPassages::new([Passage::new(day.clone(), markup)]);
                    render_day(&passages, &store, Some(&day), options).await?
                }
                None => {
                    let provider = HttpPassageProvider::new(config.passage_url.clone());
                    render_day(&provider, &store, day.as_ref(), options).await?
                }
            };
            if report {
                println!("{}", serde_json::to_string_pretty(&pass).into_diagnostic()?);
            } else {
                println!("{}", html);
                print_report_summary(&pass);
            }
        }
        Commands::Fetch { day } => {
            let day = parse_day(day)?;
            let provider = HttpPassageProvider::new(config.passage_url.clone());
            let passage = provider.passage(day.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&passage).into_diagnostic()?);
        }
        Commands::Highlight(command) => highlight_command(&store, command).await?,
        Commands::Reflect(command) => reflect_command(&store, command).await?,
    }

    Ok(())
}

/// Load a day into a detached tree and return the marked-up HTML.
async fn render_day<P: PassageProvider>(
    provider: &P,
    store: &JsonFileStore,
    day: Option<&DayKey>,
    options: PassOptions,
) -> Result<(String, PassReport)> {
    let tree = HtmlTree::parse("")?;
    let root = tree.root().clone();
    let mut session = ReadingSession::new(tree, root).with_options(options);
    let report = session.load_day(provider, store, day).await?;
    Ok((session.tree().to_html()?, report))
}

fn print_report_summary(report: &PassReport) {
    eprintln!(
        "{} applied, {} clipped, {} unmatched, {} overlapped, {} empty",
        report.applied.len(),
        report.clipped.len(),
        report.unmatched.len(),
        report.overlapped.len(),
        report.empty.len(),
    );
    if report.failed_wraps > 0 {
        eprintln!("{} spans could not be wrapped", report.failed_wraps);
    }
}

async fn highlight_command(store: &JsonFileStore, command: HighlightCommand) -> Result<()> {
    match command {
        HighlightCommand::Add {
            text,
            color,
            day,
            note,
        } => {
            let day = parse_day(day)?.unwrap_or_else(DayKey::today);
            let mut new = NewHighlight::new(day, color, &text)?;
            if let Some(note) = note {
                new = new.with_note(note);
            }
            let created = store.create(new).await?;
            println!(
                "Created highlight {} ({}) on {}: {}",
                created.id, created.color, created.day_key, created.selected_text
            );
        }
        HighlightCommand::List { day, json } => {
            let day = parse_day(day)?.unwrap_or_else(DayKey::today);
            let highlights = store.list(&day).await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&highlights).into_diagnostic()?
                );
            } else if highlights.is_empty() {
                println!("No highlights for {}", day);
            } else {
                for (color, group) in ColorGroups::new(&highlights).iter() {
                    println!("{}:", color);
                    for highlight in group {
                        println!("  [{}] {}", highlight.id, highlight.selected_text);
                        if let Some(note) = &highlight.note {
                            println!("      {}", note);
                        }
                    }
                }
            }
        }
        HighlightCommand::Remove { id } => {
            store.delete(HighlightId(id)).await?;
            println!("Deleted highlight {}", id);
        }
    }
    Ok(())
}

async fn reflect_command(store: &JsonFileStore, command: ReflectCommand) -> Result<()> {
    match command {
        ReflectCommand::Add { text, day } => {
            let day = parse_day(day)?.unwrap_or_else(DayKey::today);
            let created = store
                .create_reflection(NewReflection::new(day, text)?)
                .await?;
            println!("Saved reflection {} for {}", created.id, created.day_key);
        }
        ReflectCommand::List { day, json } => {
            let day = parse_day(day)?.unwrap_or_else(DayKey::today);
            let reflections = store.list_reflections(&day).await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&reflections).into_diagnostic()?
                );
            } else if reflections.is_empty() {
                println!("No reflections for {}", day);
            } else {
                for reflection in reflections {
                    println!(
                        "[{}] {}",
                        reflection.created_at.format("%Y-%m-%d %H:%M"),
                        reflection.content
                    );
                }
            }
        }
    }
    Ok(())
}

fn parse_day(day: Option<String>) -> Result<Option<DayKey>> {
    Ok(day.map(DayKey::new).transpose()?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() -> Result<()> {
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
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
