//! Tracked job inspection and resume

use super::generate::{print_outcome, GenerationArgs};
use super::{print_progress, Context};
use anyhow::Result;
use clap::Subcommand;
use hy3d_gen::{CancelToken, JobRecord, Orchestrator};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// List tracked jobs, oldest first
    List,

    /// Show a tracked job, optionally asking the service for its live status
    Status {
        /// Job ID
        id: String,

        /// Also query the remote service
        #[arg(long)]
        remote: bool,
    },

    /// Wait for a timed-out or interrupted job and download its model
    Resume {
        /// Job ID
        id: String,

        /// Output path (defaults to the path recorded at submission)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        generation: GenerationArgs,
    },
}

pub fn run(ctx: &Context, cmd: JobCommands) -> Result<()> {
    match cmd {
        JobCommands::List => list(ctx),
        JobCommands::Status { id, remote } => status(ctx, &id, remote),
        JobCommands::Resume {
            id,
            output,
            generation,
        } => resume(ctx, &id, output, &generation),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let store = ctx.job_store();
    let records = store.list()?;

    if records.is_empty() {
        println!("No tracked jobs in {}", store.root().display());
        return Ok(());
    }

    println!("{:<40} {:<10} {:>4}  {:<20} SUBJECT", "JOB ID", "STATE", "%", "SUBMITTED");
    for record in &records {
        println!(
            "{:<40} {:<10} {:>4}  {:<20} {}",
            record.id(),
            record.state.to_string(),
            record.progress,
            record.job.submitted_at.format("%Y-%m-%d %H:%M:%S"),
            subject(record)
        );
    }
    println!("\n{} job(s)", records.len());
    Ok(())
}

fn status(ctx: &Context, id: &str, remote: bool) -> Result<()> {
    let record = ctx.job_store().load(id)?;

    println!("Job: {}", record.id());
    println!("  Kind: {}", record.job.kind);
    println!("  Subject: {}", subject(&record));
    println!("  State: {} ({}%)", record.state, record.progress);
    println!(
        "  Submitted: {}",
        record.job.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Updated: {}",
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(output) = &record.output_path {
        println!("  Output: {}", output);
    }
    if let Some(error) = &record.error {
        println!("  Error: {}", error);
    }
    if record.state.is_resumable() {
        println!("  Resumable: yes (hy3d job resume {})", record.id());
    }

    if remote {
        let status = ctx.client()?.query_status(id)?;
        println!("  Remote: {}", status.phase());
    }
    Ok(())
}

fn resume(ctx: &Context, id: &str, output: Option<PathBuf>, args: &GenerationArgs) -> Result<()> {
    let store = ctx.job_store();
    let record = store.load(id)?;

    let destination = match output.or_else(|| record.output_path.as_ref().map(PathBuf::from)) {
        Some(path) => path,
        None => {
            let files = ctx.file_manager()?;
            files.output_path_for_prompt(record.job.prompt.as_deref().unwrap_or("resumed"))
        }
    };

    println!("Resuming {} ({})...", record.id(), record.state);

    let orchestrator = Orchestrator::new(ctx.client()?).with_store(&store);
    let outcome = orchestrator.resume(
        record,
        &destination,
        &args.wait(&ctx.config),
        &CancelToken::new(),
        &mut print_progress,
    )?;

    print_outcome(&outcome);
    Ok(())
}

fn subject(record: &JobRecord) -> String {
    record
        .job
        .prompt
        .clone()
        .or_else(|| record.source.clone())
        .unwrap_or_else(|| "-".to_string())
}
