//! Bioagents CLI - run one agent over a line-oriented stdin/stdout wire.
//!
//! Each line on stdin is one envelope, e.g.
//! `(request :reply-with m1 :content (CHOOSE-SENSE :ekb-term "MAP2K1"))`;
//! every reply and provenance notification goes to stdout, one per line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use bioagents_agents::biosense::{BioSenseModule, StaticOntology};
use bioagents_agents::dtda::{Dtda, DtdaModule, DrugTargetDb, MutationEffectIndex, StaticGenomics};
use bioagents_agents::msa::{InMemoryLiterature, MsaModule};
use bioagents_core::prelude::*;

#[derive(Parser)]
#[command(name = "bioagents")]
#[command(author, version, about = "Biology question-answering agents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sense-disambiguation agent
    Biosense,

    /// Run the disease-target-drug agent
    Dtda {
        /// SQLite drug-target database (default: built-in curated set)
        #[arg(long)]
        drug_db: Option<PathBuf>,
    },

    /// Run the mechanism-search agent
    Msa,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Biosense => {
            let dispatcher = BioSenseModule::dispatcher()?;
            let mut agent = BioSenseModule::new(StaticOntology::curated());
            serve(&dispatcher, &mut agent)
        }
        Commands::Dtda { drug_db } => {
            let db = match drug_db {
                Some(path) => DrugTargetDb::open(&path)
                    .with_context(|| format!("opening drug database {}", path.display()))?,
                None => DrugTargetDb::curated().context("loading curated drug entries")?,
            };
            let dispatcher = DtdaModule::dispatcher()?;
            let mut agent = DtdaModule::new(Dtda::new(
                db,
                MutationEffectIndex::curated(),
                StaticGenomics::curated(),
            ));
            serve(&dispatcher, &mut agent)
        }
        Commands::Msa => {
            let dispatcher = MsaModule::dispatcher()?;
            let mut agent = MsaModule::new(InMemoryLiterature::curated());
            serve(&dispatcher, &mut agent)
        }
    }
}

/// Read envelopes from stdin until EOF, one per line.
///
/// Malformed lines and escalations are logged and the loop continues; only
/// an unusable stdout ends the run.
fn serve<A>(dispatcher: &Dispatcher<A>, agent: &mut A) -> Result<()> {
    info!(agent = dispatcher.name(), "ready");
    let stdin = io::stdin();
    let mut transport = StdoutTransport::new();
    for line in stdin.lock().lines() {
        let line = line.context("reading request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope = match Envelope::parse(&line) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(agent = dispatcher.name(), %err, "unparseable line, skipping");
                continue;
            }
        };
        if envelope.performative != Performative::Request {
            warn!(
                agent = dispatcher.name(),
                performative = %envelope.performative,
                "ignoring non-request"
            );
            continue;
        }
        match dispatcher.handle_request(agent, &mut transport, &envelope) {
            Ok(_) => {}
            Err(DispatchError::Escalation(escalation)) => {
                // The peer owns this condition; no reply was sent.
                error!(
                    agent = dispatcher.name(),
                    code = %escalation.code,
                    message = %escalation.message,
                    "request escalated"
                );
            }
            Err(DispatchError::Transport(err)) => {
                return Err(err).context("writing reply");
            }
        }
    }
    info!(agent = dispatcher.name(), "stdin closed, shutting down");
    Ok(())
}

/// Line-per-envelope writer over stdout.
struct StdoutTransport {
    out: io::Stdout,
}

impl StdoutTransport {
    fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Transport for StdoutTransport {
    fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        let mut handle = self.out.lock();
        writeln!(handle, "{}", envelope.render())?;
        handle.flush()?;
        Ok(())
    }
}
