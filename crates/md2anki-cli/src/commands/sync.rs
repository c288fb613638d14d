use std::path::Path;

use anyhow::{Result, bail};
use md2anki::{Pipeline, RunOptions, SyncOutcome};

/// Run the full sync and print the outcome to stdout.
pub async fn run(pipeline: &Pipeline, path: &Path, options: &RunOptions) -> Result<()> {
    let report = pipeline.run(path, options).await?;

    match &report.outcome {
        SyncOutcome::Created(_) => println!("Added ✅ {} [{}]", report.front, report.deck),
        SyncOutcome::Updated(_) => println!("Updated 🔃 {}", report.front),
        SyncOutcome::Failed(reason) => bail!("failed to sync \"{}\": {reason}", report.front),
    }

    Ok(())
}
