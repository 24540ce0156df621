use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csv_adapter::CsvRecordExporter;
use html_adapter::HtmlPageSource;
use sqlite_adapter::SqliteChannelRepository;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tgstat_core::application::ExtractionServiceImpl;
use tgstat_core::domain::{
    ChannelRecord, ClearOutcome, Decision, ExportOutcome, PutOutcome, ReplacementProposal,
};
use tgstat_core::ports::{ConfirmationGate, FixedGate};
use tgstat_core::store::SnapshotStore;
use tgstat_core::utils::format_timestamp_to_local;

/// CLI tool to collect TGStat channel statistics into a local database
#[derive(Parser, Debug)]
#[command(name = "tgstat-cli")]
#[command(about = "Extracts channel statistics from saved TGStat pages, stores and exports them")]
struct Cli {
    /// Path to the SQLite database holding channel records
    #[arg(long = "db", env = "TGSTAT_DB", default_value = "tgstat.db", global = true)]
    db: PathBuf,

    /// Accept every confirmation without prompting
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a channel page and save it
    Extract {
        /// Saved channel page, or `-` for stdin
        #[arg(long = "html", required = true)]
        html: String,

        /// Address the page was loaded from (defaults to the page's canonical link)
        #[arg(long = "url")]
        url: Option<String>,
    },
    /// Remove every stored channel
    Clear,
    /// Write all stored channels to a dated CSV file
    Export {
        /// Folder the CSV file is written to
        #[arg(long = "out-dir", env = "TGSTAT_EXPORT_DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print one stored channel by its Telegram link
    Show { telegram_link: String },
}

#[cfg(windows)]
const TERMINAL_DEVICE: &str = "CONIN$";
#[cfg(not(windows))]
const TERMINAL_DEVICE: &str = "/dev/tty";

/// Where confirmation answers are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerSource {
    Stdin,
    /// The controlling terminal, used when stdin carries the page
    Terminal,
}

/// Reads one answer line; end of input or a read failure declines
fn read_decision<R: BufRead>(mut reader: R) -> Decision {
    let mut answer = String::new();
    match reader.read_line(&mut answer) {
        Ok(0) => {
            tracing::warn!("no answer before end of input, declining");
            Decision::Decline
        }
        Ok(_) => match answer.trim().to_lowercase().as_str() {
            "y" | "yes" | "д" | "да" => Decision::Accept,
            _ => Decision::Decline,
        },
        Err(e) => {
            tracing::warn!(error = %e, "could not read answer, declining");
            Decision::Decline
        }
    }
}

/// Asks the operator on the terminal
struct TerminalGate {
    source: AnswerSource,
}

impl TerminalGate {
    fn new(page_from_stdin: bool) -> Self {
        let source = if page_from_stdin {
            AnswerSource::Terminal
        } else {
            AnswerSource::Stdin
        };
        Self { source }
    }

    fn ask(&self, question: &str) -> Decision {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{} [y/N] ", question);
        let _ = stderr.flush();

        match self.source {
            AnswerSource::Stdin => read_decision(io::stdin().lock()),
            AnswerSource::Terminal => match File::open(TERMINAL_DEVICE) {
                Ok(tty) => read_decision(BufReader::new(tty)),
                Err(e) => {
                    tracing::warn!(device = TERMINAL_DEVICE, error = %e, "no terminal to ask on, declining");
                    Decision::Decline
                }
            },
        }
    }
}

impl ConfirmationGate for TerminalGate {
    fn confirm_replace(&self, proposal: &ReplacementProposal) -> Decision {
        eprintln!("Channel {} is already stored.", proposal.title);
        eprintln!(
            "Last updated: {}",
            format_timestamp_to_local(&proposal.existing_last_updated)
        );
        eprintln!("Current data:");
        eprintln!("- Subscribers: {}", proposal.existing_subscribers);
        eprintln!("- Posts per 7 days: {}", proposal.existing_average_posts);
        eprintln!("New data:");
        eprintln!("- Subscribers: {}", proposal.incoming_subscribers);
        eprintln!("- Posts per 7 days: {}", proposal.incoming_average_posts);
        self.ask("Update the record?")
    }

    fn confirm_clear(&self) -> Decision {
        eprintln!("Clearing the database removes every stored channel. All previous work will be lost.");
        self.ask("Continue?")
    }
}

/// Whether the command reads the page itself from stdin
fn page_from_stdin(command: &Command) -> bool {
    matches!(command, Command::Extract { html, .. } if html == "-")
}

fn print_record(record: &ChannelRecord) {
    println!("Channel: {}", record.title);
    println!("TGStat link: {}", record.channel_url);
    println!("Telegram link: {}", record.telegram_link);
    println!("Subscribers: {}", record.subscribers);
    println!("Posts per 7 days: {}", record.average_posts_per_7_days);
    println!("Last updated: {}", format_timestamp_to_local(&record.last_updated));
}

fn run(cli: Cli) -> Result<()> {
    tracing::debug!(command = ?cli.command, db = %cli.db.display(), "running command");
    let repository = SqliteChannelRepository::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;

    let out_dir = match &cli.command {
        Command::Export { out_dir } => out_dir.clone(),
        _ => PathBuf::from("."),
    };

    let gate: Box<dyn ConfirmationGate> = if cli.yes {
        Box::new(FixedGate(Decision::Accept))
    } else {
        Box::new(TerminalGate::new(page_from_stdin(&cli.command)))
    };

    // Instantiate the core business service with dependency injection
    let service = ExtractionServiceImpl::new(
        SnapshotStore::new(Box::new(repository)),
        Box::new(CsvRecordExporter::new(out_dir)),
        gate,
    );

    match cli.command {
        Command::Extract { html, url } => {
            let page = if html == "-" {
                HtmlPageSource::from_reader(io::stdin().lock(), url)
            } else {
                HtmlPageSource::from_file(&html, url)
            };
            let page = page.with_context(|| format!("reading page {}", html))?;

            let (snapshot, outcome) = service
                .extract_and_save(&page)
                .context("extracting channel page")?;
            match outcome {
                PutOutcome::Inserted | PutOutcome::Updated => {
                    let action = if outcome == PutOutcome::Inserted { "added" } else { "updated" };
                    println!("Data successfully {}!", action);
                    println!("Channel: {}", snapshot.title);
                    println!("TGStat link: {}", snapshot.channel_url);
                    println!("Telegram link: {}", snapshot.telegram_link);
                    println!("Subscribers: {}", snapshot.subscribers);
                    println!("Posts per 7 days: {}", snapshot.average_posts_per_7_days);
                }
                PutOutcome::Declined => println!("Update cancelled, stored data left unchanged."),
            }
        }
        Command::Clear => match service.clear_all().context("clearing database")? {
            ClearOutcome::Cleared(removed) => {
                println!("Database cleared ({} channels removed).", removed)
            }
            ClearOutcome::Declined => println!("Clearing cancelled."),
        },
        Command::Export { .. } => match service.export_all().context("exporting channels")? {
            ExportOutcome::Written(path) => println!("Exported channels to {}", path.display()),
            ExportOutcome::NothingToExport => println!("The database is empty. Nothing to export."),
        },
        Command::Show { telegram_link } => {
            match service.show(&telegram_link).context("reading channel")? {
                Some(record) => print_record(&record),
                None => println!("No channel stored under {}", telegram_link),
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
