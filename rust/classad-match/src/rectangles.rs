//! Per-record interval storage, split by direction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use classad_common::{Result, error::Error, verify_arg, verify_data};
use classad_index::{Dimension, Interval, RecordId, Value};
use classad_keyset::KeySet;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::AdId;

/// Identifier of a port, global to a [`Rectangles`] collection.
pub type PortId = u32;

/// One match side of an advertisement. An advertisement offering several resources
/// (or requesting several) has one port per resource, numbered from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub ad: AdId,
    pub number: u32,
}

/// What a rectangle was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub ad: AdId,
    pub port: PortId,
    /// Position of `port` among the ports of `ad`.
    pub port_number: u32,
}

/// Which side of a match an interval describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A constraint the record places on its counterpart.
    Imported,
    /// A value the record offers.
    Exported,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Imported => "imported",
            Direction::Exported => "exported",
        })
    }
}

/// A population of rectangles, one per record id `0..r_id()`.
///
/// Rectangles hang off ports, and ports off advertisements: each rectangle is one
/// disjunct of the constraint of one port.
///
/// Every record starts out unconstrained on every attribute. Bounds added with
/// [`Rectangles::add_lower_bound`] and [`Rectangles::add_upper_bound`] narrow the
/// record's interval for one attribute and direction. A record whose declaration
/// cannot be expressed as an interval is *deviant* for that attribute and direction;
/// it keeps no interval there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rectangles {
    imported: BTreeMap<String, Dimension>,
    exported: BTreeMap<String, Dimension>,
    deviant_imported: BTreeMap<String, KeySet>,
    deviant_exported: BTreeMap<String, KeySet>,
    /// Ports, by port id.
    ports: Vec<Port>,
    /// Port of each rectangle, by rectangle id.
    rectangle_ports: Vec<PortId>,
    /// Rectangles dropped with [`Rectangles::remove`].
    removed: KeySet,
}

impl Rectangles {
    pub fn new() -> Rectangles {
        Rectangles::default()
    }

    /// Opens the next port of advertisement `ad`.
    ///
    /// Ports are numbered per advertisement in opening order; the ports of one
    /// advertisement are opened one after the other.
    pub fn new_port(&mut self, ad: AdId) -> PortId {
        let number = match self.ports.last() {
            Some(last) if last.ad == ad => last.number + 1,
            _ => 0,
        };
        self.ports.push(Port { ad, number });
        (self.ports.len() - 1) as PortId
    }

    /// Allocates the next rectangle id on the most recent port of advertisement `ad`,
    /// opening its first port if the most recent port belongs to another one.
    pub fn new_rectangle(&mut self, ad: AdId) -> RecordId {
        let port = match self.ports.last() {
            Some(last) if last.ad == ad => (self.ports.len() - 1) as PortId,
            _ => self.new_port(ad),
        };
        self.rectangle_ports.push(port);
        (self.rectangle_ports.len() - 1) as RecordId
    }

    /// Number of rectangle ids allocated so far, removed ones included.
    pub fn r_id(&self) -> RecordId {
        self.rectangle_ports.len() as RecordId
    }

    /// Number of port ids allocated so far.
    pub fn p_id(&self) -> PortId {
        self.ports.len() as PortId
    }

    pub fn is_live(&self, key: RecordId) -> bool {
        key < self.r_id() && !self.removed.contains(key)
    }

    /// Ids of every rectangle not removed.
    pub fn live_ids(&self) -> KeySet {
        let mut live = KeySet::full(self.rectangle_ports.len());
        live.subtract(&self.removed);
        live
    }

    pub fn map_port_id(&self, port: PortId) -> Option<Port> {
        self.ports.get(port as usize).copied()
    }

    /// Port and advertisement of a live rectangle.
    pub fn origin(&self, key: RecordId) -> Option<Origin> {
        if !self.is_live(key) {
            return None;
        }
        let port = *self.rectangle_ports.get(key as usize)?;
        let Port { ad, number } = self.map_port_id(port)?;
        Some(Origin {
            ad,
            port,
            port_number: number,
        })
    }

    pub fn owner(&self, key: RecordId) -> Option<AdId> {
        self.origin(key).map(|origin| origin.ad)
    }

    /// Live rectangles derived from advertisement `ad`.
    pub fn owned_by(&self, ad: AdId) -> KeySet {
        self.rectangle_ports
            .iter()
            .enumerate()
            .filter(|&(key, &port)| {
                self.map_port_id(port).is_some_and(|p| p.ad == ad)
                    && !self.removed.contains(key as RecordId)
            })
            .map(|(key, _)| key as RecordId)
            .collect()
    }

    pub fn dimensions(&self, direction: Direction) -> &BTreeMap<String, Dimension> {
        match direction {
            Direction::Imported => &self.imported,
            Direction::Exported => &self.exported,
        }
    }

    pub fn deviants(&self, direction: Direction) -> &BTreeMap<String, KeySet> {
        match direction {
            Direction::Imported => &self.deviant_imported,
            Direction::Exported => &self.deviant_exported,
        }
    }

    pub fn interval(&self, key: RecordId, attr: &str, direction: Direction) -> Option<&Interval> {
        self.dimensions(direction).get(attr)?.get(&key)
    }

    pub fn is_deviant(&self, key: RecordId, attr: &str, direction: Direction) -> bool {
        self.deviants(direction)
            .get(attr)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Returns `true` when the record declares `attr` in `direction`, either as an
    /// interval or deviantly.
    pub fn declares(&self, key: RecordId, attr: &str, direction: Direction) -> bool {
        self.interval(key, attr, direction).is_some() || self.is_deviant(key, attr, direction)
    }

    /// Narrows the upper bound of the record's interval for `attr`.
    ///
    /// The bound replaces the current one when it is strictly lower, or equal in value
    /// and open where the current one is closed. Returns `Ok(false)` when the value
    /// cannot be ordered against the interval's endpoints; the record is then deviant
    /// for `attr` in `direction`.
    ///
    /// # Errors
    ///
    /// `InconsistentBound` when `value` lies below the interval's lower endpoint. The
    /// interval is left unchanged.
    pub fn add_upper_bound(
        &mut self,
        key: RecordId,
        attr: &str,
        value: impl Into<Value>,
        open: bool,
        direction: Direction,
    ) -> Result<bool> {
        let value = value.into();
        self.verify_bound(key, &value)?;
        if self.is_deviant(key, attr, direction) {
            return Ok(false);
        }

        let mut interval = self.current(key, attr, direction);
        let (Some(order), Some(against_lower)) = (
            value.compare(&interval.upper),
            value.compare(&interval.lower),
        ) else {
            trace!("{direction} {attr} of rectangle {key}: upper bound {value} is incomparable");
            self.mark_deviant(key, attr, direction)?;
            return Ok(false);
        };
        if against_lower == Ordering::Less {
            return Err(Error::inconsistent_bound(
                attr,
                format!("upper bound {value} of rectangle {key} is below {interval}"),
            ));
        }
        if replaces(order, open, interval.open_upper) {
            interval.upper = value;
            interval.open_upper = open;
            self.dimensions_mut(direction)
                .entry(attr.to_string())
                .or_default()
                .insert(key, interval);
        }
        Ok(true)
    }

    /// Mirror of [`Rectangles::add_upper_bound`]: the bound replaces the current one
    /// when it is strictly higher, or equal and open where the current one is closed.
    /// A value above the upper endpoint is an `InconsistentBound` error.
    pub fn add_lower_bound(
        &mut self,
        key: RecordId,
        attr: &str,
        value: impl Into<Value>,
        open: bool,
        direction: Direction,
    ) -> Result<bool> {
        let value = value.into();
        self.verify_bound(key, &value)?;
        if self.is_deviant(key, attr, direction) {
            return Ok(false);
        }

        let mut interval = self.current(key, attr, direction);
        let (Some(order), Some(against_upper)) = (
            value.compare(&interval.lower),
            value.compare(&interval.upper),
        ) else {
            trace!("{direction} {attr} of rectangle {key}: lower bound {value} is incomparable");
            self.mark_deviant(key, attr, direction)?;
            return Ok(false);
        };
        if against_upper == Ordering::Greater {
            return Err(Error::inconsistent_bound(
                attr,
                format!("lower bound {value} of rectangle {key} is above {interval}"),
            ));
        }
        if replaces(order.reverse(), open, interval.open_lower) {
            interval.lower = value;
            interval.open_lower = open;
            self.dimensions_mut(direction)
                .entry(attr.to_string())
                .or_default()
                .insert(key, interval);
        }
        Ok(true)
    }

    /// Records that the record offers exactly `value` for `attr`.
    ///
    /// Returns `Ok(false)` if the record is already deviant on that export.
    pub fn add_exported_value(
        &mut self,
        key: RecordId,
        attr: &str,
        value: impl Into<Value>,
    ) -> Result<bool> {
        let value = value.into();
        self.verify_bound(key, &value)?;
        if self.is_deviant(key, attr, Direction::Exported) {
            return Ok(false);
        }
        self.exported
            .entry(attr.to_string())
            .or_default()
            .insert(key, Interval::point(key, value));
        Ok(true)
    }

    /// Records that the record declares `attr` in a way no index can represent.
    /// Any interval it had for `attr` in `direction` is dropped.
    pub fn mark_deviant(&mut self, key: RecordId, attr: &str, direction: Direction) -> Result<()> {
        verify_arg!(key, self.is_live(key));
        let dimensions = self.dimensions_mut(direction);
        if let Some(dimension) = dimensions.get_mut(attr) {
            dimension.remove(&key);
            if dimension.is_empty() {
                dimensions.remove(attr);
            }
        }
        let deviants = match direction {
            Direction::Imported => &mut self.deviant_imported,
            Direction::Exported => &mut self.deviant_exported,
        };
        deviants.entry(attr.to_string()).or_default().insert(key);
        Ok(())
    }

    /// Drops a record from every dimension. Its id is not reused. Returns `false` if
    /// the record was unknown or already removed.
    pub fn remove(&mut self, key: RecordId) -> bool {
        if !self.is_live(key) {
            return false;
        }
        for dimensions in [&mut self.imported, &mut self.exported] {
            dimensions.retain(|_, dimension| {
                dimension.remove(&key);
                !dimension.is_empty()
            });
        }
        for deviants in [&mut self.deviant_imported, &mut self.deviant_exported] {
            deviants.retain(|_, keys| {
                keys.remove(key);
                !keys.is_empty()
            });
        }
        self.removed.insert(key);
        true
    }

    /// Checks that every rectangle sits on a known port, and that every interval and
    /// deviant entry refers to a live record under its own key.
    pub fn validate(&self) -> Result<()> {
        for &port in &self.rectangle_ports {
            verify_data!(rectangle_ports, port < self.p_id());
        }
        for direction in [Direction::Imported, Direction::Exported] {
            for (attr, dimension) in self.dimensions(direction) {
                for (&key, interval) in dimension {
                    if !self.is_live(key) || interval.key != key {
                        return Err(Error::invalid_format(
                            format!("{direction} {attr}"),
                            format!("interval {interval} registered under unknown record {key}"),
                        ));
                    }
                }
            }
            for (attr, keys) in self.deviants(direction) {
                for key in keys {
                    verify_data!(attr, self.is_live(key));
                    verify_data!(
                        attr,
                        self.interval(key, attr, direction).is_none()
                    );
                }
            }
        }
        Ok(())
    }

    fn verify_bound(&self, key: RecordId, value: &Value) -> Result<()> {
        verify_arg!(key, self.is_live(key));
        verify_arg!(value, value.as_number().is_none_or(|n| !n.is_nan()));
        Ok(())
    }

    fn current(&self, key: RecordId, attr: &str, direction: Direction) -> Interval {
        self.interval(key, attr, direction)
            .cloned()
            .unwrap_or_else(|| Interval::unbounded(key))
    }

    fn dimensions_mut(&mut self, direction: Direction) -> &mut BTreeMap<String, Dimension> {
        match direction {
            Direction::Imported => &mut self.imported,
            Direction::Exported => &mut self.exported,
        }
    }
}

impl fmt::Display for Rectangles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "rectangles: {} live of {}, {} ports",
            self.live_ids().count(),
            self.r_id(),
            self.p_id()
        )?;
        for direction in [Direction::Exported, Direction::Imported] {
            for (attr, dimension) in self.dimensions(direction) {
                writeln!(f, "{direction} {attr}:")?;
                for (key, interval) in dimension {
                    writeln!(f, "  {key}: {interval}")?;
                }
            }
            for (attr, keys) in self.deviants(direction) {
                writeln!(f, "{direction} {attr} deviant: {keys}")?;
            }
        }
        for key in self.live_ids().iter() {
            if let Some(Origin {
                ad,
                port,
                port_number,
            }) = self.origin(key)
            {
                writeln!(f, "{key} --> port {port} --> ad {ad} (port {port_number})")?;
            }
        }
        Ok(())
    }
}

/// Decides whether a new bound replaces the current one. `order` is the new value
/// compared to the current one, oriented so that `Less` means tighter.
fn replaces(order: Ordering, open: bool, current_open: bool) -> bool {
    match order {
        Ordering::Less => true,
        Ordering::Equal => open && !current_open,
        Ordering::Greater => false,
    }
}
