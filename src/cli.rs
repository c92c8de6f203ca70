use crate::gateway::HttpGateway;
use crate::generation::SubmitOutcome;
use crate::model::{ClientConfig, ItemId};
use crate::orchestrator::Orchestrator;
use crate::publish::ShareOutcome;
use crate::session::Location;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Results go to stdout so they can be piped; progress and notes go to stderr.
enum OutputLine {
    Result(String),
    Note(String),
}

/// Line sink for the text commands, drained by a blocking writer so printing
/// never stalls a runtime worker.
struct Output {
    tx: mpsc::UnboundedSender<OutputLine>,
    writer: tokio::task::JoinHandle<()>,
}

impl Output {
    fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
        let writer = tokio::task::spawn_blocking(move || {
            let stdout = std::io::stdout();
            let stderr = std::io::stderr();
            let mut out = std::io::LineWriter::new(stdout.lock());
            let mut err = std::io::LineWriter::new(stderr.lock());

            while let Some(line) = rx.blocking_recv() {
                let _ = match line {
                    OutputLine::Result(msg) => writeln!(out, "{msg}"),
                    OutputLine::Note(msg) => writeln!(err, "{msg}"),
                };
            }

            let _ = out.flush();
            let _ = err.flush();
        });
        Self { tx, writer }
    }

    fn result(&self, line: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Result(line.into()));
    }

    fn note(&self, line: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Note(line.into()));
    }

    /// Close the sink and wait until everything queued has been written.
    async fn finish(self) {
        drop(self.tx);
        let _ = self.writer.await;
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "influence-cli",
    version,
    about = "Generate LinkedIn posts with the Influence AI backend, browse them and share them"
)]
pub struct Cli {
    /// Base URL of the Influence backend
    #[arg(
        long,
        env = "INFLUENCE_BASE_URL",
        default_value = "http://127.0.0.1:8000",
        global = true
    )]
    pub base_url: String,

    /// Address the client was opened at; after login the backend redirects here with ?token=...
    #[arg(
        long,
        env = "INFLUENCE_ENTRY_URL",
        default_value = "http://localhost/",
        global = true
    )]
    pub entry_url: String,

    /// How long a share status stays visible (and further shares stay blocked)
    #[arg(long, default_value = "3s", global = true)]
    pub share_reset_delay: humantime::Duration,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log file for the interactive UI
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the URL that starts the LinkedIn login
    LoginUrl,
    /// Show who the entry URL's credential belongs to
    Whoami,
    /// Generate a post and print it
    Generate {
        /// Your professional role, e.g. "Software Engineer"
        #[arg(long)]
        role: String,
        /// Topic to write about, e.g. "The future of AI"
        #[arg(long)]
        topic: String,
    },
    /// Print post history, newest first
    History {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Show at most this many posts
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Share a post from the history on LinkedIn
    Share {
        /// Id of the post to share
        #[arg(long)]
        id: ItemId,
    },
}

impl Cli {
    /// Whether this invocation takes over the terminal.
    pub fn is_interactive(&self) -> bool {
        self.command.is_none() && cfg!(feature = "tui")
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        entry_url: args.entry_url.clone(),
        share_reset_delay: Duration::from(args.share_reset_delay),
        user_agent: format!("influence-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let gateway = Arc::new(HttpGateway::new(&cfg)?);
    let location = Location::parse(&cfg.entry_url)?;

    match args.command.clone() {
        Some(Command::LoginUrl) => {
            println!("{}", gateway.login_url());
            Ok(())
        }
        Some(Command::Whoami) => run_whoami(&cfg, gateway, location).await,
        Some(Command::Generate { role, topic }) => {
            run_generate(&cfg, gateway, location, &role, &topic).await
        }
        Some(Command::History { json, limit }) => {
            run_history(&cfg, gateway, location, json, limit).await
        }
        Some(Command::Share { id }) => run_share(&cfg, gateway, location, id).await,
        None => {
            #[cfg(feature = "tui")]
            {
                crate::tui::run(cfg, gateway, location).await
            }
            #[cfg(not(feature = "tui"))]
            {
                // Fallback when built without TUI support.
                run_history(&cfg, gateway, location, false, None).await
            }
        }
    }
}

async fn run_whoami(
    cfg: &ClientConfig,
    gateway: Arc<HttpGateway>,
    mut location: Location,
) -> Result<()> {
    let login_url = gateway.login_url();
    let orch = Orchestrator::new(cfg, gateway);
    orch.start(&mut location).await;
    let output = Output::spawn();

    let profile = orch.session().profile();
    output.result(crate::text_summary::welcome_line(profile.as_ref(), &login_url));
    if let Some(p) = profile {
        output.result(format!("Picture: {}", p.picture));
    } else if orch.session().is_authenticated() {
        output.note("The credential was not accepted by the backend.");
    }

    output.finish().await;
    Ok(())
}

async fn run_generate(
    cfg: &ClientConfig,
    gateway: Arc<HttpGateway>,
    mut location: Location,
    role: &str,
    topic: &str,
) -> Result<()> {
    let orch = Orchestrator::new(cfg, gateway);
    orch.start(&mut location).await;
    let output = Output::spawn();

    output.note("Generating...");
    if orch.generate(role, topic).await == SubmitOutcome::Rejected {
        output.finish().await;
        anyhow::bail!("--role and --topic must not be empty");
    }

    output.note("== Generated post ==");
    output.result(orch.generation().state().result_text);
    output.note("== Post history ==");
    let summary = crate::text_summary::build_history_summary(
        &orch.history().items(),
        &orch.publish().state(),
        Some(5),
    );
    for line in summary.lines {
        output.note(line);
    }

    output.finish().await;
    Ok(())
}

async fn run_history(
    cfg: &ClientConfig,
    gateway: Arc<HttpGateway>,
    mut location: Location,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let orch = Orchestrator::new(cfg, gateway);
    orch.start(&mut location).await;

    let mut items = orch.history().items();
    if json {
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        let out = serde_json::to_string_pretty(&items).context("serialize history")?;
        let output = Output::spawn();
        output.result(out);
        output.finish().await;
        return Ok(());
    }

    let output = Output::spawn();
    let summary =
        crate::text_summary::build_history_summary(&items, &orch.publish().state(), limit);
    for line in summary.lines {
        output.result(line);
    }
    output.finish().await;
    Ok(())
}

async fn run_share(
    cfg: &ClientConfig,
    gateway: Arc<HttpGateway>,
    mut location: Location,
    id: ItemId,
) -> Result<()> {
    let orch = Orchestrator::new(cfg, gateway);
    orch.start(&mut location).await;

    if orch.history().is_empty() {
        anyhow::bail!("history is empty, nothing to share");
    }

    let output = Output::spawn();
    let mut status_rx = orch.publish().subscribe();
    output.note(crate::publish::SHARING_MESSAGE);
    let Some(outcome) = orch.share(id).await else {
        output.finish().await;
        anyhow::bail!("no post with id {id} in history");
    };

    match outcome {
        ShareOutcome::LoginRequired => {
            if let Some(alert) = orch.take_alert() {
                output.note(alert);
            }
        }
        ShareOutcome::Busy => output.note("Another share is in progress."),
        ShareOutcome::Posted | ShareOutcome::Failed(_) => {
            output.result(orch.publish().state().status_message);
            // Stay for the damping window so the status is seen through to the reset.
            tokio::select! {
                cleared = status_rx.wait_for(|s| !s.is_busy()) => {
                    if cleared.is_ok() {
                        output.note("Share status cleared.");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    orch.dispose();
                    output.note("Interrupted before the share status cleared.");
                }
            }
        }
    }

    output.finish().await;
    Ok(())
}
