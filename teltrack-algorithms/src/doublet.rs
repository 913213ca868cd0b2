//! Doublet construction and middle-hit matching.
//!
//! Hits downstream of the field start are deflected along a parabola. The
//! correction `0.5 * curvature * (z - z_mag)^2` is removed from every hit
//! before straight-line arithmetic, so doublets and triplets live in
//! corrected coordinates.

use teltrack_core::histogram::HistogramSink;
use teltrack_core::hit::{Hit, Point3, Xy};
use teltrack_core::track::{Arm, Doublet};

/// Middle-hit residual histograms, per arm.
const RESIDUAL_HISTOGRAMS: [[&str; 2]; 2] = [
    ["arm0_triplet_residual_x", "arm0_triplet_residual_y"],
    ["arm1_triplet_residual_x", "arm1_triplet_residual_y"],
];

/// Removes the parabolic deflection from a position.
#[inline]
#[must_use]
pub fn sagitta_correct(position: Point3, curvature: Xy, z_mag: f64) -> Xy {
    let dz = position.z - z_mag;
    let sagitta = 0.5 * dz * dz;
    Xy::new(
        position.x - curvature.x * sagitta,
        position.y - curvature.y * sagitta,
    )
}

/// Builds a doublet from the two outer hits of an arm.
///
/// The hits must lie at different z; coincident z divides by zero.
#[must_use]
pub fn build_doublet(first: &Hit, last: &Hit, curvature: Xy, z_mag: f64) -> Doublet {
    let c1 = sagitta_correct(first.position, curvature, z_mag);
    let c3 = sagitta_correct(last.position, curvature, z_mag);
    let dz = last.z() - first.z();

    Doublet {
        position: Point3::new(
            0.5 * (c1.x + c3.x),
            0.5 * (c1.y + c3.y),
            0.5 * (first.z() + last.z()),
        ),
        slope: Xy::new((c3.x - c1.x) / dz, (c3.y - c1.y) / dz),
        raw_delta: Xy::new(last.x() - first.x(), last.y() - first.y()),
        curvature,
        z_mag,
    }
}

/// Residual of a middle hit to the doublet line, in corrected coordinates.
#[inline]
#[must_use]
pub fn middle_hit_residual(doublet: &Doublet, hit: &Hit) -> Xy {
    let corrected = sagitta_correct(hit.position, doublet.curvature, doublet.z_mag);
    corrected - doublet.position.extrapolate(doublet.slope, hit.z())
}

/// Matches a middle hit of `arm` to a doublet.
///
/// The residual goes to the sink before the cut. Returns the residual, or
/// `None` if either component exceeds the cut. A residual exactly on the
/// cut is accepted.
pub fn match_middle_hit(
    arm: Arm,
    doublet: &Doublet,
    hit: &Hit,
    cut: Xy,
    sink: &mut dyn HistogramSink,
) -> Option<Xy> {
    let residual = middle_hit_residual(doublet, hit);
    let [name_x, name_y] = RESIDUAL_HISTOGRAMS[arm.index()];
    sink.add_entry(name_x, residual.x);
    sink.add_entry(name_y, residual.y);
    (!residual.exceeds(cut)).then_some(residual)
}
