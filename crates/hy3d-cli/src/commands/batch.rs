//! Folder batch processing

use super::Context;
use anyhow::Result;
use clap::Args;
use hy3d_gen::batch::{DEFAULT_MAX_IMAGES, DEFAULT_PATTERN};
use hy3d_gen::{collect_inputs, run_batch, BatchEvent, BatchRequest, CancelToken, Orchestrator};
use std::path::PathBuf;

use super::generate::GenerationArgs;

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Folder containing input images
    pub dir: PathBuf,

    /// Filename pattern (`*` and `?` wildcards)
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Where models are written as `<stem>_3d.glb`
    #[arg(long, short, default_value = "batch_output")]
    pub output: PathBuf,

    /// Process at most this many images
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGES)]
    pub max_images: usize,

    #[command(flatten)]
    pub generation: GenerationArgs,
}

pub fn run(ctx: &Context, args: &BatchArgs) -> Result<()> {
    let inputs = collect_inputs(&args.dir, &args.pattern, args.max_images)?;
    if inputs.is_empty() {
        anyhow::bail!(
            "No images matching '{}' found in {}",
            args.pattern,
            args.dir.display()
        );
    }

    let mut request = BatchRequest::new(inputs, &args.output);
    request.options = args.generation.options(&ctx.config);
    request.wait = args.generation.wait(&ctx.config);

    println!(
        "Processing {} image(s) from {} -> {}",
        request.inputs.len(),
        args.dir.display(),
        args.output.display()
    );

    let store = ctx.job_store();
    let orchestrator = Orchestrator::new(ctx.client()?).with_store(&store);
    let report = run_batch(&orchestrator, &request, &CancelToken::new(), &mut |event| {
        match event {
            BatchEvent::Started {
                index,
                total,
                input,
            } => println!("\n[{}/{}] {}", index + 1, total, input.display()),
            BatchEvent::Progress { update, .. } => {
                println!("  [{:>3}%] {}", update.percent, update.message)
            }
            BatchEvent::Finished { item, .. } => {
                let status = if item.success { "OK" } else { "FAILED" };
                println!("  {}: {}", status, item.message);
            }
        }
    });

    println!();
    println!("{}", report.summary());

    if report.succeeded() == 0 {
        anyhow::bail!("All {} batch item(s) failed", report.total());
    }
    Ok(())
}
