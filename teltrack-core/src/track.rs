//! Track candidate types: doublets, triplets and segments.

use crate::hit::{Hit, Point3, Xy};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Telescope arm: the upstream (planes 0-1-2) or downstream (planes 3-4-5)
/// group of three planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Arm {
    Upstream,
    Downstream,
}

impl Arm {
    /// Both arms in processing order.
    pub const ALL: [Arm; 2] = [Arm::Upstream, Arm::Downstream];

    /// Plane ids as (outer, middle, outer).
    #[must_use]
    pub fn planes(self) -> [u32; 3] {
        match self {
            Arm::Upstream => [0, 1, 2],
            Arm::Downstream => [3, 4, 5],
        }
    }

    /// Index of the arm (0 upstream, 1 downstream).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Arm::Upstream => 0,
            Arm::Downstream => 1,
        }
    }
}

/// Line candidate from the two outer hits of an arm.
///
/// Position and slope are in curvature-corrected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Doublet {
    /// Mean corrected position of the two hits.
    pub position: Point3,
    /// Corrected slope (dx/dz, dy/dz).
    pub slope: Xy,
    /// Uncorrected offset of the second hit from the first.
    pub raw_delta: Xy,
    /// Curvature used for the correction.
    pub curvature: Xy,
    /// z where the field begins.
    pub z_mag: f64,
}

/// Three hits of one arm matched to a line.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triplet {
    /// Hits as (outer, middle, outer).
    pub hits: [Hit; 3],
    /// Position of the seeding doublet.
    pub position: Point3,
    /// Slope of the seeding doublet.
    pub slope: Xy,
    /// Residual of the middle hit to the doublet line.
    pub residual: Xy,
    /// Number of accepted pairings with the other arm.
    pub match_count: u32,
}

impl Triplet {
    /// Creates a triplet from its seeding doublet and middle-hit residual.
    #[must_use]
    pub fn new(outer: Hit, middle: Hit, far: Hit, doublet: &Doublet, residual: Xy) -> Self {
        Self {
            hits: [outer, middle, far],
            position: doublet.position,
            slope: doublet.slope,
            residual,
            match_count: 0,
        }
    }

    /// Transverse position along the triplet line at `z`.
    #[inline]
    #[must_use]
    pub fn extrapolate(&self, z: f64) -> Xy {
        self.position.extrapolate(self.slope, z)
    }
}

/// A six-plane track candidate built from one triplet per arm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Upstream triplet hits followed by downstream triplet hits.
    pub hits: [Hit; 6],
    /// Indices of the source triplets in their arm stores.
    pub triplets: [usize; 2],
    /// Reference point, at the mean z of the two triplets.
    pub position: Point3,
    /// Mean slope of the two triplets.
    pub slope: Xy,
    /// Curvature estimate, refined from the arm kink when the field is on.
    pub curvature: Xy,
    /// DUT hits uniquely attached to this segment.
    pub dut_hits: Vec<Hit>,
    /// DUT candidates on the plane currently being matched.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub match_count: u32,
}

impl Segment {
    /// Transverse position along the segment line at `z`.
    #[inline]
    #[must_use]
    pub fn extrapolate(&self, z: f64) -> Xy {
        self.position.extrapolate(self.slope, z)
    }

    /// Telescope hits followed by attached DUT hits.
    pub fn all_hits(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter().chain(self.dut_hits.iter())
    }
}
