//! Model preview descriptions

use anyhow::Result;
use hy3d_gen::nodes::{BatchPreviewNode, PreviewNode};

pub fn run(paths: &[String], index: usize) -> Result<()> {
    let output = match paths {
        [single] => PreviewNode::preview(single),
        _ => BatchPreviewNode::preview(&paths.join("\n"), index),
    };
    println!("{}", output.display_text);
    Ok(())
}
