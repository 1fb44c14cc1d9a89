//! Multi-attribute matching over per-attribute indexes.
//!
//! The processor indexes a population of candidate rectangles, one
//! [`ClassAdIndex`] per attribute and direction, and answers windows of query
//! rectangles. A candidate matches a query rectangle when
//!
//! - every constraint the query imports admits the value the candidate exports,
//! - every constraint the candidate imports admits the value the query exports,
//!
//! where an attribute the other side does not declare at all is tolerated on the
//! exporting side and rejected on the importing side. Candidates that declare an
//! attribute in a non-indexable ("deviant") way are kept for that attribute.

use std::collections::BTreeMap;
use std::fmt;

use classad_common::{Result, error::Error, verify_arg};
use classad_index::{ClassAdIndex, Dimension, Interval, RecordId};
use classad_keyset::KeySet;
use itertools::Itertools;
use log::{debug, error, trace, warn};

use crate::{
    AdId,
    options::QueryOptions,
    rectangles::{Direction, Origin, Rectangles},
    summary::{Dedup, Summary},
};

/// The indexes of one direction.
struct Side {
    direction: Direction,
    indexes: BTreeMap<String, ClassAdIndex>,
    /// Ids holding an indexed interval, by attribute.
    indexed: BTreeMap<String, KeySet>,
    /// Ids declaring the attribute deviantly, by attribute.
    deviant: BTreeMap<String, KeySet>,
}

impl Side {
    fn new(direction: Direction) -> Side {
        Side {
            direction,
            indexes: BTreeMap::new(),
            indexed: BTreeMap::new(),
            deviant: BTreeMap::new(),
        }
    }

    fn build(rectangles: &Rectangles, direction: Direction, live: &KeySet) -> Result<Side> {
        let mut side = Side::new(direction);
        for (attr, dimension) in rectangles.dimensions(direction) {
            let index = if dimension.keys().all(|&key| live.contains(key)) {
                ClassAdIndex::make(attr, dimension)?
            } else {
                let restricted: Dimension = dimension
                    .iter()
                    .filter(|&(&key, _)| live.contains(key))
                    .map(|(&key, interval)| (key, interval.clone()))
                    .collect();
                ClassAdIndex::make(attr, &restricted)?
            };
            debug!(
                "{direction} {attr}: {} index over {} rectangles",
                index.kind(),
                index.len()
            );
            let keys = dimension
                .keys()
                .copied()
                .filter(|&key| live.contains(key))
                .collect();
            side.indexed.insert(attr.clone(), keys);
            side.indexes.insert(attr.clone(), index);
        }
        for (attr, keys) in rectangles.deviants(direction) {
            let mut keys = keys.clone();
            keys.intersect_with(live);
            if !keys.is_empty() {
                side.deviant.insert(attr.clone(), keys);
            }
        }
        Ok(side)
    }

    /// Candidates compatible with `query` on `attr`: the ones the index reports, plus
    /// deviant and undeclared ones as `options` allow.
    fn candidates(
        &self,
        attr: &str,
        query: &Interval,
        live: &KeySet,
        options: &QueryOptions,
    ) -> Result<KeySet> {
        let mut matched = KeySet::new();
        if let Some(index) = self.indexes.get(attr) {
            if !index.filter(query, &mut matched)? {
                trace!(
                    "{} {attr}: {query} does not apply to a {} index",
                    self.direction,
                    index.kind()
                );
            }
        }
        let deviant = self.deviant.get(attr);
        if options.keep_deviant {
            if let Some(deviant) = deviant {
                matched |= deviant;
            }
        }
        if options.keep_undeclared {
            let mut undeclared = live.clone();
            if let Some(indexed) = self.indexed.get(attr) {
                undeclared -= indexed;
            }
            if let Some(deviant) = deviant {
                undeclared -= deviant;
            }
            matched |= &undeclared;
        }
        Ok(matched)
    }

    fn remove(&mut self, key: RecordId, rectangles: &Rectangles) -> Result<()> {
        for (attr, dimension) in rectangles.dimensions(self.direction) {
            let (Some(interval), Some(index)) = (dimension.get(&key), self.indexes.get_mut(attr))
            else {
                continue;
            };
            if !index.delete(key, interval)? {
                warn!(
                    "{} {attr}: rectangle {key} with {interval} was not indexed",
                    self.direction
                );
            }
        }
        for keys in self.indexed.values_mut().chain(self.deviant.values_mut()) {
            keys.remove(key);
        }
        Ok(())
    }

    fn index_count(&self) -> usize {
        self.indexes.len()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (attr, index) in &self.indexes {
            writeln!(f, "{} {attr} ({}):", self.direction, index.kind())?;
            write!(f, "{index}")?;
        }
        for (attr, keys) in &self.deviant {
            writeln!(f, "{} {attr} deviant: {keys}", self.direction)?;
        }
        Ok(())
    }
}

/// See the module documentation.
pub struct QueryProcessor {
    options: QueryOptions,
    exported: Side,
    imported: Side,
    /// Indexed rectangle ids not purged yet.
    live: KeySet,
    summarized: bool,
    poisoned: bool,
}

impl QueryProcessor {
    pub fn new(options: QueryOptions) -> Result<QueryProcessor> {
        options.validate()?;
        Ok(QueryProcessor {
            options,
            exported: Side::new(Direction::Exported),
            imported: Side::new(Direction::Imported),
            live: KeySet::new(),
            summarized: false,
            poisoned: false,
        })
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Indexed rectangle ids still live.
    pub fn live(&self) -> &KeySet {
        &self.live
    }

    pub fn is_summarized(&self) -> bool {
        self.summarized
    }

    /// Returns `false` once an index reported a broken invariant; only a successful
    /// [`QueryProcessor::initialize_indexes`] makes the processor usable again.
    pub fn is_usable(&self) -> bool {
        !self.poisoned
    }

    pub fn index(&self, attr: &str, direction: Direction) -> Option<&ClassAdIndex> {
        match direction {
            Direction::Imported => self.imported.indexes.get(attr),
            Direction::Exported => self.exported.indexes.get(attr),
        }
    }

    /// Builds one index per attribute and direction.
    ///
    /// With a `summary`, its reduced rectangles are indexed and `rectangles` (the full
    /// collection) is only used to validate the de-duplication context. Any failure
    /// leaves the processor cleared.
    pub fn initialize_indexes(
        &mut self,
        rectangles: &Rectangles,
        summary: Option<&Summary>,
    ) -> Result<()> {
        self.clear_indexes();
        match self.build(rectangles, summary) {
            Ok(()) => {
                self.poisoned = false;
                debug!(
                    "indexed {} rectangles: {} exported and {} imported attributes{}",
                    self.live.count(),
                    self.exported.index_count(),
                    self.imported.index_count(),
                    if self.summarized { " (summarized)" } else { "" }
                );
                Ok(())
            }
            Err(err) => {
                warn!("index initialization failed, rolling back: {err}");
                self.clear_indexes();
                Err(err)
            }
        }
    }

    fn build(&mut self, rectangles: &Rectangles, summary: Option<&Summary>) -> Result<()> {
        let (indexed, live) = match summary {
            Some(summary) => {
                summary.validate(rectangles)?;
                let mut live = summary.rectangles.live_ids();
                live.intersect_with(&summary.dedup.representatives);
                (&summary.rectangles, live)
            }
            None => {
                rectangles.validate()?;
                (rectangles, rectangles.live_ids())
            }
        };
        self.exported = Side::build(indexed, Direction::Exported, &live)?;
        self.imported = Side::build(indexed, Direction::Imported, &live)?;
        self.live = live;
        self.summarized = summary.is_some();
        Ok(())
    }

    /// Drops every index.
    pub fn clear_indexes(&mut self) {
        if !self.live.is_empty() {
            debug!(
                "clearing {} exported and {} imported indexes",
                self.exported.index_count(),
                self.imported.index_count()
            );
        }
        self.exported = Side::new(Direction::Exported);
        self.imported = Side::new(Direction::Imported);
        self.live.clear();
        self.summarized = false;
    }

    /// Adds to `result` every indexed rectangle matching at least one live rectangle
    /// of `window`.
    pub fn do_query(&mut self, window: &Rectangles, result: &mut KeySet) -> Result<()> {
        self.verify_usable()?;
        verify_arg!(window, window.r_id() as usize <= self.options.max_window);
        let outcome = self.query_window(window, result);
        self.check(outcome)
    }

    fn query_window(&self, window: &Rectangles, result: &mut KeySet) -> Result<()> {
        for q in window.live_ids().iter() {
            let mut partial = self.live.clone();

            for (attr, dimension) in window.dimensions(Direction::Imported) {
                let Some(interval) = dimension.get(&q) else {
                    continue;
                };
                let matched = self
                    .exported
                    .candidates(attr, interval, &self.live, &self.options)?;
                partial &= &matched;
                trace!("query {q}: imported {attr} {interval} leaves {}", partial.count());
            }

            for (attr, importers) in &self.imported.indexed {
                if !window.declares(q, attr, Direction::Exported) {
                    partial -= importers;
                }
            }
            if !self.options.keep_deviant {
                for (attr, importers) in &self.imported.deviant {
                    if !window.declares(q, attr, Direction::Exported) {
                        partial -= importers;
                    }
                }
            }
            trace!("query {q}: undeclared exports leave {}", partial.count());

            for (attr, dimension) in window.dimensions(Direction::Exported) {
                let Some(interval) = dimension.get(&q) else {
                    continue;
                };
                let matched = self
                    .imported
                    .candidates(attr, interval, &self.live, &self.options)?;
                partial &= &matched;
                trace!("query {q}: exported {attr} {interval} leaves {}", partial.count());
            }

            *result |= &partial;
        }
        Ok(())
    }

    /// Purges rectangle `r_id` from the indexes.
    ///
    /// Without summarization `rectangles` is the indexed collection and `r_id` is
    /// removed from every index and from `rectangles`. With summarization `rectangles`
    /// is the summary's reduced collection and `r_id` a constituent: it leaves its
    /// representative, which is purged only once it has no constituents left.
    /// Returns `Ok(false)` for an unknown id.
    pub fn purge_rectangle(
        &mut self,
        r_id: RecordId,
        rectangles: &mut Rectangles,
        dedup: Option<&mut Dedup>,
    ) -> Result<bool> {
        self.verify_usable()?;
        self.verify_summarized(dedup.is_some())?;

        let (target, released) = match dedup {
            Some(dedup) => {
                let Some((representative, emptied)) = dedup.release(r_id) else {
                    return Ok(false);
                };
                if !emptied {
                    debug!("purged constituent {r_id} of representative {representative}");
                    return Ok(true);
                }
                (representative, true)
            }
            None => (r_id, false),
        };
        if !self.live.contains(target) {
            return Ok(released);
        }

        let outcome = self.purge_indexed(target, rectangles);
        self.check(outcome)?;
        debug!("purged rectangle {target}");
        Ok(true)
    }

    fn purge_indexed(&mut self, key: RecordId, rectangles: &mut Rectangles) -> Result<()> {
        self.exported.remove(key, rectangles)?;
        self.imported.remove(key, rectangles)?;
        self.live.remove(key);
        rectangles.remove(key);
        Ok(())
    }

    /// Translates an indexed rectangle id into the port and advertisement it stands
    /// for.
    ///
    /// `rectangles` is the full collection. With summarization every call hands out
    /// the next unclaimed constituent of the representative `id`, so repeated calls
    /// cycle through the advertisements sharing it; `None` once all are claimed (see
    /// [`Dedup::reset_claims`]).
    pub fn map_rectangle_id(
        &self,
        id: RecordId,
        rectangles: &Rectangles,
        dedup: Option<&mut Dedup>,
    ) -> Result<Option<Origin>> {
        self.verify_usable()?;
        self.verify_summarized(dedup.is_some())?;
        if !self.live.contains(id) {
            return Ok(None);
        }
        let constituent = match dedup {
            Some(dedup) => match dedup.claim(id) {
                Some(constituent) => constituent,
                None => return Ok(None),
            },
            None => id,
        };
        Ok(rectangles.origin(constituent))
    }

    /// Indexed rectangle ids derived from advertisement `ad`. `rectangles` is the full
    /// collection.
    pub fn unmap_classad_id(
        &self,
        ad: AdId,
        rectangles: &Rectangles,
        dedup: Option<&Dedup>,
    ) -> Result<KeySet> {
        self.verify_usable()?;
        self.verify_summarized(dedup.is_some())?;
        let owned = rectangles.owned_by(ad);
        let mut ids = match dedup {
            Some(dedup) => owned
                .iter()
                .filter_map(|constituent| dedup.representative_of(constituent))
                .collect(),
            None => owned,
        };
        ids.intersect_with(&self.live);
        Ok(ids)
    }

    fn verify_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::invalid_operation(
                "query processor used after an internal invariant violation",
            ));
        }
        Ok(())
    }

    fn verify_summarized(&self, with_dedup: bool) -> Result<()> {
        verify_arg!(dedup, with_dedup == self.summarized);
        Ok(())
    }

    /// Marks the processor unusable when `outcome` reports a broken invariant.
    fn check<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(err) = &outcome {
            if err.is_internal() {
                error!("query processor disabled: {err}");
                self.poisoned = true;
            }
        }
        outcome
    }
}

impl Default for QueryProcessor {
    fn default() -> Self {
        QueryProcessor {
            options: QueryOptions::default(),
            exported: Side::new(Direction::Exported),
            imported: Side::new(Direction::Imported),
            live: KeySet::new(),
            summarized: false,
            poisoned: false,
        }
    }
}

impl fmt::Display for QueryProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "query processor: {} live rectangles{}{}",
            self.live.count(),
            if self.summarized { ", summarized" } else { "" },
            if self.poisoned { ", unusable" } else { "" }
        )?;
        writeln!(
            f,
            "attributes: {}",
            self.exported
                .indexes
                .keys()
                .chain(self.imported.indexes.keys())
                .unique()
                .join(", ")
        )?;
        write!(f, "{}{}", self.exported, self.imported)
    }
}
