//! Command implementations for classad-index-cmd

use anyhow::{Context, Result};
use classad_match::{QueryOptions, QueryProcessor, Rectangles, Summary};
use log::info;

use crate::utils::load_json;

pub mod inspect;
pub mod query;

/// Loads a rectangle collection and, optionally, its summary.
pub fn load_rectangles(path: &str, summary: Option<&str>) -> Result<(Rectangles, Option<Summary>)> {
    let rectangles: Rectangles = load_json(path)?;
    let summary = summary.map(load_json::<Summary>).transpose()?;
    info!(
        "loaded {} rectangles from {path}{}",
        rectangles.r_id(),
        summary
            .as_ref()
            .map(|s| format!(", {} representatives", s.dedup.representatives.count()))
            .unwrap_or_default()
    );
    Ok((rectangles, summary))
}

/// Indexes `rectangles`, or the representatives of `summary` when given.
pub fn build_processor(rectangles: &Rectangles, summary: Option<&Summary>) -> Result<QueryProcessor> {
    let mut processor = QueryProcessor::new(QueryOptions::default())?;
    processor
        .initialize_indexes(rectangles, summary)
        .context("Failed to build the indexes")?;
    Ok(processor)
}
