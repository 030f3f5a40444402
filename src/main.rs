//! driveup - push a directory tree to OneDrive
//!
//! - Files under the threshold: one PUT each
//! - Larger files: upload session, sequential byte-range PUTs
//! - One file at a time; a failed file never stops the run

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::Arc;

use driveup::config::UploadConfig;
use driveup::credential::{Credential, NoReauth, Reauthorize};
use driveup::fs_enum::UploadKind;
use driveup::logger::TextLogger;
use driveup::orchestrator::{plan_uploads, Orchestrator, RunSummary};
use driveup::progress::{ConsoleProgress, Fanout};
use driveup::report::JsonReport;
use driveup::transport::ReqwestTransport;
use driveup::Args;

/// Asks on the terminal for a replacement token, with the progress display hidden
struct PromptReauth {
    progress: Arc<ConsoleProgress>,
}

impl Reauthorize for PromptReauth {
    fn new_token(&self) -> Result<String> {
        self.progress.suspend(|| {
            print!("Access token rejected. Please enter new token: ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read token from stdin")?;
            let token = line.trim();
            if token.is_empty() {
                anyhow::bail!("no token entered");
            }
            Ok(token.to_string())
        })
    }
}

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let args = Args::parse();
    let config = args.upload_config()?;
    if let Some(warning) = config.chunk_size_warning() {
        eprintln!("Warning: {warning}");
    }
    let remote_folder = args.remote_folder();

    if args.dry_run {
        return dry_run(&args, &config, &remote_folder);
    }

    let credential = Credential::new(args.resolve_token()?);
    let transport = ReqwestTransport::new(config.request_timeout())?;

    let progress = Arc::new(ConsoleProgress::new(args.verbose));
    let mut sinks = Fanout::new();
    sinks.push(progress.clone());
    if let Some(path) = &args.log_file {
        let logger = TextLogger::new(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        sinks.push(Arc::new(logger));
    }
    if let Some(path) = &args.report {
        sinks.push(Arc::new(JsonReport::new(path)?));
    }

    let prompt = PromptReauth {
        progress: progress.clone(),
    };
    let reauth: &dyn Reauthorize = if args.no_prompt { &NoReauth } else { &prompt };

    let orchestrator = Orchestrator::new(&config, &transport, reauth, &sinks);
    let summary = orchestrator.run(&args.source, &credential, &remote_folder)?;

    print_summary(&summary, args.verbose);
    Ok(())
}

fn dry_run(args: &Args, config: &UploadConfig, remote_folder: &str) -> Result<()> {
    let planned = plan_uploads(config, &args.source, remote_folder)?;

    println!("DRY RUN MODE - Nothing will be uploaded");
    let mut total = 0u64;
    for item in &planned {
        total += item.target.file_size;
        let how = match item.kind {
            UploadKind::Simple => "simple".to_string(),
            UploadKind::Session => format!("session, {} chunk(s)", item.chunks),
        };
        println!(
            "  {} -> /{}/{} ({} MB, {})",
            item.target.local_path.display(),
            item.target.remote_folder,
            item.target.file_name,
            item.target.size_mb(),
            how
        );
    }
    let sessions = planned.iter().filter(|p| p.kind == UploadKind::Session).count();
    println!(
        "Total: {} files ({:.2} GB), {} simple, {} session",
        planned.len(),
        total as f64 / 1_073_741_824.0,
        planned.len() - sessions,
        sessions
    );
    Ok(())
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    println!();
    println!("=== Upload Complete ===");
    println!("Files uploaded: {}", summary.uploaded());
    println!("Files failed: {}", summary.failed());
    println!(
        "Total size: {:.2} MB",
        summary.bytes_uploaded() as f64 / 1_048_576.0
    );
    println!("Time: {:.2} min(s)", summary.elapsed.as_secs_f64() / 60.0);

    if summary.failed() > 0 {
        println!("\nErrors encountered: {}", summary.failed());
        for (target, error) in summary.failures() {
            if verbose {
                eprintln!("  - {}: {:?}", target.local_path.display(), error);
            } else {
                eprintln!("  - {}: {}", target.file_name, error);
            }
        }
    }
}
