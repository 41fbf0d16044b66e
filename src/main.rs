use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use intake_assist::backend::HttpBackend;
use intake_assist::config::IntakeConfig;
use intake_assist::intake::FieldEdits;
use intake_assist::mail::{self, EmlMailItem};
use intake_assist::notify::TracingNotifier;
use intake_assist::render::SummaryPdfRenderer;
use intake_assist::submission::{CoordinatorDeps, SubmissionCoordinator, SubmissionSession};

#[derive(Parser)]
#[command(name = "intake-assist")]
#[command(about = "Submit an email and its attachments to the claims or underwriting workflow")]
#[command(version)]
struct Cli {
    /// Path to the .eml message to submit
    eml: PathBuf,

    /// Claims backend base URL (falls back to INTAKE_CLAIMS_API_URL)
    #[arg(long)]
    claims_url: Option<String>,

    /// Underwriting backend base URL (falls back to INTAKE_UNDERWRITING_API_URL)
    #[arg(long)]
    underwriting_url: Option<String>,

    /// Mailbox owner reported in the email metadata
    #[arg(long, default_value = "")]
    user_email: String,

    /// Override the extracted policy number
    #[arg(long)]
    policy_number: Option<String>,

    /// Override the document name (defaults to the subject)
    #[arg(long)]
    document_name: Option<String>,

    /// Comment submitted with the form
    #[arg(long)]
    comment: Option<String>,

    /// Do not start extraction before submitting
    #[arg(long)]
    no_background: bool,

    /// How long to wait for background extraction before submitting
    #[arg(long, default_value_t = 10)]
    extract_wait_secs: u64,
}

/// Resolve config, read the message and build its submission session.
async fn prepare(cli: &Cli) -> intake_assist::error::Result<(IntakeConfig, SubmissionSession)> {
    let config = IntakeConfig::resolve(cli.claims_url.clone(), cli.underwriting_url.clone())?;

    eprintln!("📨 Intake Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Claims:       {}", config.claims_base_url);
    eprintln!("   Underwriting: {}", config.underwriting_base_url);

    let item = EmlMailItem::open(&cli.eml, cli.user_email.clone()).await?;
    let snapshot = mail::capture(&item).await;
    eprintln!("   Subject:      {}", snapshot.subject);
    eprintln!("   Attachments:  {}", snapshot.attachments.len());

    let session = SubmissionSession::from_snapshot(&snapshot)?;
    eprintln!(
        "   Workflow:     {} (primary: {})\n",
        session.workflow(),
        session.primary().name
    );

    Ok((config, session))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let (config, mut session) = prepare(&cli)
        .await
        .with_context(|| format!("Failed to prepare {}", cli.eml.display()))?;

    // ── Coordinator ──────────────────────────────────────────────────────
    let backend = Arc::new(HttpBackend::new(config.clone())?);
    let coordinator = SubmissionCoordinator::new(
        config,
        CoordinatorDeps {
            backend: backend.clone(),
            status: backend,
            renderer: Arc::new(SummaryPdfRenderer::default()),
            notifier: Arc::new(TracingNotifier),
        },
    );

    if !cli.no_background {
        if let Some(handle) = coordinator.spawn_background_extraction(&session) {
            let wait = Duration::from_secs(cli.extract_wait_secs);
            if tokio::time::timeout(wait, handle).await.is_err() {
                tracing::warn!(wait_secs = cli.extract_wait_secs, "Extraction still running, submitting without it");
            }
        }
    }

    session.edit(FieldEdits {
        policy_number: cli.policy_number,
        document_name: cli.document_name,
        comment: cli.comment,
        timestamp: None,
    });

    let outcome = coordinator.run(&mut session).await?;

    println!("{}", outcome.message());
    if let Some(link) = outcome.link() {
        println!("{link}");
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
