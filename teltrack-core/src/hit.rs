//! Hit types and per-event hit grouping.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of telescope planes (two arms of three).
pub const TELESCOPE_PLANES: u32 = 6;

/// Plane ids at or above this value belong to devices under test.
pub const FIRST_DUT_PLANE: u32 = TELESCOPE_PLANES;

/// A pair of transverse values.
///
/// Used for cut windows, slopes (dx/dz, dy/dz), residuals and curvatures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl Xy {
    /// Zero in both components.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new pair.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both components are zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Returns true if either component's magnitude exceeds the window.
    ///
    /// Equality is inside the window.
    #[inline]
    #[must_use]
    pub fn exceeds(&self, window: Xy) -> bool {
        self.x.abs() > window.x || self.y.abs() > window.y
    }

    /// Returns true if both magnitudes are strictly below the window.
    #[inline]
    #[must_use]
    pub fn strictly_within(&self, window: Xy) -> bool {
        self.x.abs() < window.x && self.y.abs() < window.y
    }
}

impl std::ops::Sub for Xy {
    type Output = Xy;

    #[inline]
    fn sub(self, rhs: Xy) -> Xy {
        Xy::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A position in the telescope frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Transverse part of the point.
    #[inline]
    #[must_use]
    pub fn xy(&self) -> Xy {
        Xy::new(self.x, self.y)
    }

    /// Moves the point along a straight line of the given slope to `z`.
    #[inline]
    #[must_use]
    pub fn extrapolate(&self, slope: Xy, z: f64) -> Xy {
        let dz = z - self.z;
        Xy::new(self.x + slope.x * dz, self.y + slope.y * dz)
    }
}

/// A single position measurement on one plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Plane id: 0-5 telescope, 6 and up DUT.
    pub plane: u32,
    /// Layer label written to the segment dump (sensor id).
    pub layer: u32,
    /// Measured position.
    pub position: Point3,
}

impl Hit {
    /// Creates a hit whose layer label equals its plane id.
    #[inline]
    #[must_use]
    pub fn new(plane: u32, x: f64, y: f64, z: f64) -> Self {
        Self {
            plane,
            layer: plane,
            position: Point3::new(x, y, z),
        }
    }

    /// Sets the layer label.
    #[inline]
    #[must_use]
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    #[must_use]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Returns true if the hit lies on a device under test.
    #[inline]
    #[must_use]
    pub fn is_dut(&self) -> bool {
        self.plane >= FIRST_DUT_PLANE
    }
}

/// Run and event numbers of one readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventHeader {
    pub run: u32,
    pub event: u64,
}

impl EventHeader {
    #[must_use]
    pub fn new(run: u32, event: u64) -> Self {
        Self { run, event }
    }
}

/// All hits of one event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    pub header: EventHeader,
    pub hits: Vec<Hit>,
}

impl Event {
    /// Creates an event from its header and hits.
    #[must_use]
    pub fn new(header: EventHeader, hits: Vec<Hit>) -> Self {
        Self { header, hits }
    }
}

/// Hits of one event keyed by plane id.
///
/// Hits keep their input order within each plane, which keeps the
/// combinatorial scans (and therefore the monitoring output) reproducible.
#[derive(Debug, Clone, Default)]
pub struct HitGroup {
    planes: BTreeMap<u32, Vec<Hit>>,
}

impl HitGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups the given hits by plane.
    pub fn from_hits<'a, I>(hits: I) -> Self
    where
        I: IntoIterator<Item = &'a Hit>,
    {
        let mut group = Self::new();
        group.extend(hits);
        group
    }

    /// Adds a hit to its plane.
    pub fn push(&mut self, hit: Hit) {
        self.planes.entry(hit.plane).or_default().push(hit);
    }

    /// Adds every hit of the iterator.
    pub fn extend<'a, I>(&mut self, hits: I)
    where
        I: IntoIterator<Item = &'a Hit>,
    {
        for hit in hits {
            self.push(*hit);
        }
    }

    /// Removes all hits, keeping per-plane allocations.
    pub fn clear(&mut self) {
        for hits in self.planes.values_mut() {
            hits.clear();
        }
    }

    /// Hits recorded on a plane (empty if none).
    #[must_use]
    pub fn plane(&self, plane: u32) -> &[Hit] {
        self.planes.get(&plane).map_or(&[][..], Vec::as_slice)
    }

    /// Non-empty DUT planes in ascending plane order.
    pub fn dut_planes(&self) -> impl Iterator<Item = (u32, &[Hit])> {
        self.planes
            .range(FIRST_DUT_PLANE..)
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(&plane, hits)| (plane, hits.as_slice()))
    }

    /// Total number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planes.values().map(Vec::len).sum()
    }

    /// Returns true if no hits are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planes.values().all(Vec::is_empty)
    }

    /// Number of hits per non-empty plane, in plane order.
    #[must_use]
    pub fn occupancy(&self) -> Vec<(u32, usize)> {
        self.planes
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(&plane, hits)| (plane, hits.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy_window_comparisons() {
        let window = Xy::new(1.0, 2.0);

        // Equality is inside for rejection, outside for strict acceptance
        assert!(!Xy::new(1.0, 2.0).exceeds(window));
        assert!(!Xy::new(1.0, 2.0).strictly_within(window));

        assert!(Xy::new(-1.5, 0.0).exceeds(window));
        assert!(Xy::new(0.5, -1.9).strictly_within(window));
    }

    #[test]
    fn test_point_extrapolate() {
        let p = Point3::new(1.0, 2.0, 10.0);
        let at = p.extrapolate(Xy::new(0.1, -0.2), 20.0);
        assert!((at.x - 2.0).abs() < 1e-12);
        assert!((at.y - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_hit_group_keeps_order() {
        let hits = vec![
            Hit::new(1, 0.0, 0.0, 150.0),
            Hit::new(0, 1.0, 0.0, 0.0),
            Hit::new(1, 2.0, 0.0, 150.0),
            Hit::new(7, 3.0, 0.0, 900.0),
        ];
        let group = HitGroup::from_hits(&hits);

        assert_eq!(group.len(), 4);
        assert_eq!(group.plane(0).len(), 1);
        let plane1: Vec<f64> = group.plane(1).iter().map(Hit::x).collect();
        assert_eq!(plane1, vec![0.0, 2.0]);
        assert!(group.plane(5).is_empty());

        let duts: Vec<u32> = group.dut_planes().map(|(plane, _)| plane).collect();
        assert_eq!(duts, vec![7]);
    }

    #[test]
    fn test_hit_group_clear() {
        let hits = vec![Hit::new(0, 1.0, 0.0, 0.0), Hit::new(6, 1.0, 0.0, 0.0)];
        let mut group = HitGroup::from_hits(&hits);
        group.clear();
        assert!(group.is_empty());
        assert_eq!(group.dut_planes().count(), 0);
        assert!(group.occupancy().is_empty());
    }

    #[test]
    fn test_hit_layer_defaults_to_plane() {
        let hit = Hit::new(3, 0.0, 0.0, 0.0);
        assert_eq!(hit.layer, 3);
        assert_eq!(hit.with_layer(21).layer, 21);
        assert!(!hit.is_dut());
        assert!(Hit::new(6, 0.0, 0.0, 0.0).is_dut());
    }
}
