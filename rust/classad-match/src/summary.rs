//! Output of the rectangle summarization step.
//!
//! Identical rectangles are collapsed into one *representative* rectangle of a reduced
//! [`Rectangles`] collection; the full-collection rectangles it stands for are its
//! *constituents*. Only representatives are indexed.

use std::collections::BTreeMap;

use classad_common::{Result, error::Error};
use classad_index::RecordId;
use classad_keyset::KeySet;
use serde::{Deserialize, Serialize};

use crate::rectangles::Rectangles;

/// A reduced rectangle collection together with its de-duplication context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    /// Representatives, indexed by representative id.
    pub rectangles: Rectangles,
    pub dedup: Dedup,
}

impl Summary {
    /// Checks the summary against the full rectangle collection it was derived from.
    pub fn validate(&self, full: &Rectangles) -> Result<()> {
        self.rectangles.validate()?;
        self.dedup.validate(self.rectangles.r_id(), full.r_id())
    }
}

/// Representative bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dedup {
    /// Representatives that still have constituents.
    pub representatives: KeySet,
    /// Representative id to the ids of the full-collection rectangles it stands for.
    pub constituents: BTreeMap<RecordId, KeySet>,
    /// Constituent id to its representative.
    pub const_rep_map: BTreeMap<RecordId, RecordId>,
    /// Constituents already handed out by id mapping.
    pub claimed: KeySet,
}

impl Dedup {
    pub fn new() -> Dedup {
        Dedup::default()
    }

    /// Registers `constituent` as stood for by `representative`.
    pub fn assign(&mut self, representative: RecordId, constituent: RecordId) {
        if let Some(previous) = self.const_rep_map.insert(constituent, representative) {
            if let Some(keys) = self.constituents.get_mut(&previous) {
                keys.remove(constituent);
            }
        }
        self.representatives.insert(representative);
        self.constituents
            .entry(representative)
            .or_default()
            .insert(constituent);
    }

    pub fn representative_of(&self, constituent: RecordId) -> Option<RecordId> {
        self.const_rep_map.get(&constituent).copied()
    }

    pub fn constituents_of(&self, representative: RecordId) -> Option<&KeySet> {
        self.constituents.get(&representative)
    }

    /// Makes every constituent available to id mapping again.
    pub fn reset_claims(&mut self) {
        self.claimed.clear();
    }

    /// Hands out the first unclaimed constituent of `representative`.
    pub(crate) fn claim(&mut self, representative: RecordId) -> Option<RecordId> {
        let constituent = self
            .constituents
            .get(&representative)?
            .iter()
            .find(|&c| !self.claimed.contains(c))?;
        self.claimed.insert(constituent);
        Some(constituent)
    }

    /// Detaches `constituent` from its representative. Returns the representative and
    /// whether it has no constituents left.
    pub(crate) fn release(&mut self, constituent: RecordId) -> Option<(RecordId, bool)> {
        let representative = self.const_rep_map.remove(&constituent)?;
        self.claimed.remove(constituent);
        let keys = self.constituents.get_mut(&representative)?;
        keys.remove(constituent);
        let emptied = keys.is_empty();
        if emptied {
            self.constituents.remove(&representative);
            self.representatives.remove(representative);
        }
        Some((representative, emptied))
    }

    /// Checks that representatives fall below `representative_count`, constituents
    /// below `constituent_count`, and that `const_rep_map` is the exact inverse of
    /// `constituents`.
    pub fn validate(&self, representative_count: RecordId, constituent_count: RecordId) -> Result<()> {
        for representative in &self.representatives {
            if representative >= representative_count {
                return Err(Error::invalid_format(
                    "representatives",
                    format!("representative {representative} out of {representative_count}"),
                ));
            }
            if !self.constituents.contains_key(&representative) {
                return Err(Error::invalid_format(
                    "constituents",
                    format!("representative {representative} has no constituents"),
                ));
            }
        }

        let mut mapped = 0;
        for (&representative, keys) in &self.constituents {
            if !self.representatives.contains(representative) {
                return Err(Error::invalid_format(
                    "constituents",
                    format!("{representative} is not a representative"),
                ));
            }
            for constituent in keys {
                if constituent >= constituent_count {
                    return Err(Error::invalid_format(
                        "constituents",
                        format!("constituent {constituent} out of {constituent_count}"),
                    ));
                }
                if self.representative_of(constituent) != Some(representative) {
                    return Err(Error::invalid_format(
                        "const_rep_map",
                        format!("constituent {constituent} is not mapped to {representative}"),
                    ));
                }
                mapped += 1;
            }
        }
        if mapped != self.const_rep_map.len() {
            return Err(Error::invalid_format(
                "const_rep_map",
                format!(
                    "{} entries for {mapped} constituents",
                    self.const_rep_map.len()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_round_robin() {
        let mut dedup = Dedup::new();
        dedup.assign(0, 4);
        dedup.assign(0, 1);
        dedup.assign(1, 2);

        assert_eq!(dedup.claim(0), Some(1));
        assert_eq!(dedup.claim(0), Some(4));
        assert_eq!(dedup.claim(0), None);
        assert_eq!(dedup.claim(1), Some(2));
        assert_eq!(dedup.claim(7), None);

        dedup.reset_claims();
        assert_eq!(dedup.claim(0), Some(1));
    }

    #[test]
    fn test_release() {
        let mut dedup = Dedup::new();
        dedup.assign(0, 0);
        dedup.assign(0, 1);
        assert_eq!(dedup.release(1), Some((0, false)));
        assert_eq!(dedup.release(1), None);
        assert_eq!(dedup.release(0), Some((0, true)));
        assert!(dedup.representatives.is_empty());
        assert!(dedup.constituents.is_empty());
    }

    #[test]
    fn test_validate() {
        let mut dedup = Dedup::new();
        dedup.assign(0, 0);
        dedup.assign(0, 2);
        dedup.assign(1, 1);
        dedup.validate(2, 3).unwrap();
        assert!(dedup.validate(1, 3).is_err());
        assert!(dedup.validate(2, 2).is_err());

        let mut broken = dedup.clone();
        broken.const_rep_map.insert(2, 1);
        assert!(broken.validate(2, 3).is_err());

        let mut broken = dedup.clone();
        broken.const_rep_map.insert(9, 0);
        assert!(broken.validate(2, 10).is_err());

        let json = serde_json::to_string(&dedup).unwrap();
        let back: Dedup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dedup);
    }
}
