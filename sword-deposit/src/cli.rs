///
/// This module implements the CLI interface for sword-deposit: argument
/// parsing, argument validation, and the `run` entrypoint used by `main`.
///
/// All workflow logic (discovery, selection, single and batch deposits,
/// reporting) lives in the [`sword-deposit-core`] crate. This module is strictly
/// for CLI glue: it turns arguments into a [`DepositPlan`], wires in the HTTP
/// transport and the terminal prompter, and prints the reports.
///
/// ## How To Use
/// - For command-line users: run the `sword-deposit` binary with `--help`.
/// - For programmatic/integration use: call [`execute`] with a constructed
///   [`Cli`], a loaded config and any transport/prompter (mocks included).
///
/// [`sword-deposit-core`]: ../../sword-deposit-core/
use crate::client::SwordClient;
use crate::load_config::load_config;
use crate::prompt::TerminalPrompter;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sword_deposit_core::config::ServerConfig;
use sword_deposit_core::contract::{DepositOptions, Prompter, SwordTransport};
use sword_deposit_core::deposit::{run_deposit, DepositPlan, DepositTarget, RunReport};
use sword_deposit_core::report::{format_batch_summary, format_report};
use sword_deposit_core::SwordError;

/// Deposit archive packages into a repository collection over SWORD v2.
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "sword-deposit",
    version,
    about = "Deposit archive files into a SWORD v2 repository collection"
)]
pub struct Cli {
    /// Path to the archive file that needs to be uploaded
    #[clap(short = 'f', long = "file", value_name = "path", conflicts_with = "directory")]
    pub file: Option<PathBuf>,

    /// Path to the directory containing all archive files that need to be uploaded
    #[clap(short = 'd', long = "directory", value_name = "path")]
    pub directory: Option<PathBuf>,

    /// Path to the server properties file to authenticate
    #[clap(short = 'p', long = "server-properties", value_name = "path")]
    pub server_properties: PathBuf,

    /// The mimetype of the archive file
    #[clap(short = 'm', long = "mimetype", value_name = "type")]
    pub mimetype: String,

    /// The suggested identifier to pass to the SWORD server
    #[clap(short = 's', long = "slug", value_name = "id")]
    pub slug: Option<String>,

    /// Send the request with the In-Progress header set to true
    #[clap(short = 'i', long = "in-progress")]
    pub in_progress: bool,

    /// Do not ask for an OpenAM SSO ID
    #[clap(short = 'o', long = "no-openam")]
    pub no_openam: bool,

    /// Send a Content-MD5 digest of each package
    #[clap(long = "md5")]
    pub md5: bool,
}

impl Cli {
    /// The file or directory to deposit; a usage error when neither was given.
    pub fn target(&self) -> Result<DepositTarget, SwordError> {
        match (&self.file, &self.directory) {
            (_, Some(directory)) => Ok(DepositTarget::Directory(directory.clone())),
            (Some(file), None) => Ok(DepositTarget::File(file.clone())),
            (None, None) => Err(SwordError::Usage(
                "You have to specify at least a file (-f) or a directory (-d)".to_string(),
            )),
        }
    }

    pub fn options(&self) -> DepositOptions {
        DepositOptions {
            mime_type: self.mimetype.clone(),
            slug: self.slug.clone(),
            in_progress: self.in_progress,
            compute_md5: self.md5,
        }
    }

    pub fn plan(&self) -> Result<DepositPlan, SwordError> {
        Ok(DepositPlan {
            target: self.target()?,
            options: self.options(),
            ask_sso_token: !self.no_openam,
        })
    }
}

/// CLI entrypoint for `main`: loads the config, builds the HTTP client and
/// runs the deposit with terminal prompts.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let plan = cli.plan().map_err(|e| {
        tracing::error!(error = %e, "Invalid arguments");
        e
    })?;
    let config = load_config(&cli.server_properties)?;
    let client = SwordClient::new(config.timeout).context("Failed to build the SWORD HTTP client")?;

    execute(&plan, &config, &client, &TerminalPrompter).await?;
    Ok(())
}

/// Run `plan` against any transport and prompter and print the reports.
///
/// Single-file runs fail with the deposit's error; directory runs succeed
/// once the directory could be read, whatever happened to individual files.
pub async fn execute<T, P>(
    plan: &DepositPlan,
    config: &ServerConfig,
    transport: &T,
    prompter: &P,
) -> Result<RunReport>
where
    T: SwordTransport,
    P: Prompter,
{
    let report = match run_deposit(transport, prompter, config, plan).await {
        Ok(report) => report,
        Err(e) => {
            match &e {
                SwordError::Connection { .. } => tracing::error!(error = %e, "Unable to connect to SWORD server"),
                SwordError::Io { .. } => tracing::error!(error = %e, "Unable to open archive file"),
                SwordError::Deposit { status, .. } => tracing::error!(
                    error = %e,
                    status,
                    "SWORD server was unable to process the request"
                ),
                SwordError::Protocol(_) => tracing::error!(error = %e, "SWORD server protocol violation"),
                _ => tracing::error!(error = %e, "Deposit run failed"),
            }
            return Err(e.into());
        }
    };

    match &report {
        RunReport::Single(receipt) => {
            println!("{}", format_report(receipt));
            tracing::info!(status = receipt.status_code, "Deposit complete");
        }
        RunReport::Batch(batch) => {
            for outcome in &batch.succeeded {
                println!("File: {}", outcome.path.display());
                println!("{}", format_report(&outcome.receipt));
            }
            for failure in &batch.failed {
                println!("Failed: {} ({})", failure.path.display(), failure.error);
            }
            let summary = format_batch_summary(batch);
            println!("{summary}");
            tracing::info!(
                imported = batch.imported(),
                failed = batch.failed_count(),
                "Batch deposit complete"
            );
        }
    }
    Ok(report)
}
