//! Query command implementation

use std::io::{self, Write};

use anyhow::{Context, Result};
use classad_index::RecordId;
use classad_keyset::KeySet;
use classad_match::{Origin, Rectangles};
use serde::Serialize;

use crate::{
    commands::{build_processor, load_rectangles},
    utils::load_json,
};

#[derive(Serialize)]
struct QueryOutput {
    window: RecordId,
    matches: Vec<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ads: Option<Vec<MappedMatch>>,
}

#[derive(Serialize)]
struct MappedMatch {
    rectangle: RecordId,
    /// Absent once every advertisement sharing the rectangle was handed out.
    #[serde(flatten)]
    origin: Option<Origin>,
}

pub fn run(rectangles: String, window: String, summary: Option<String>, map: bool) -> Result<()> {
    let stdout = io::stdout();
    execute(&rectangles, &window, summary.as_deref(), map, &mut stdout.lock())
}

fn execute(
    rectangles: &str,
    window: &str,
    summary: Option<&str>,
    map: bool,
    out: &mut impl Write,
) -> Result<()> {
    let (rectangles, mut summary) = load_rectangles(rectangles, summary)?;
    let window: Rectangles = load_json(window)?;
    let mut processor = build_processor(&rectangles, summary.as_ref())?;

    let mut result = KeySet::new();
    processor
        .do_query(&window, &mut result)
        .context("Query failed")?;

    let ads = if map {
        let mut dedup = summary.as_mut().map(|summary| &mut summary.dedup);
        let mapped = result
            .iter()
            .map(|rectangle| -> Result<MappedMatch> {
                let origin =
                    processor.map_rectangle_id(rectangle, &rectangles, dedup.as_deref_mut())?;
                Ok(MappedMatch { rectangle, origin })
            })
            .collect::<Result<Vec<_>>>()?;
        Some(mapped)
    } else {
        None
    };

    let output = QueryOutput {
        window: window.r_id(),
        matches: result.to_vec(),
        ads,
    };
    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)?;
    Ok(())
}
