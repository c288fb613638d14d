use std::path::Path;

use anyhow::Result;
use md2anki::{Pipeline, RunOptions};

/// Print what would be sent, without contacting the service.
pub fn run(pipeline: &Pipeline, path: &Path, options: &RunOptions) -> Result<()> {
    let preview = pipeline.preview(path, options)?;

    println!("Deck:  {}", preview.placement.deck);
    if !preview.placement.tags.is_empty() {
        println!("Tags:  {}", preview.placement.tags.join(" "));
    }
    println!("Front: {}", preview.note.front);
    println!("Back:");
    print!("{}", preview.note.back_html);

    Ok(())
}
