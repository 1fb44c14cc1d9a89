//! Inspect command implementation

use std::io::{self, Write};

use anyhow::Result;

use crate::commands::{build_processor, load_rectangles};

pub fn run(rectangles: String, summary: Option<String>) -> Result<()> {
    let stdout = io::stdout();
    execute(&rectangles, summary.as_deref(), &mut stdout.lock())
}

fn execute(rectangles: &str, summary: Option<&str>, out: &mut impl Write) -> Result<()> {
    let (rectangles, summary) = load_rectangles(rectangles, summary)?;
    let processor = build_processor(&rectangles, summary.as_ref())?;
    write!(out, "{rectangles}")?;
    if let Some(summary) = &summary {
        write!(out, "summary {}", summary.rectangles)?;
    }
    write!(out, "{processor}")?;
    Ok(())
}
