//! Cut windows and run parameters for track finding.

use crate::error::{Error, Result};
use crate::hit::Xy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cut windows of the reconstruction stages.
///
/// Built from the ordered sequence
/// `[doublet, triplet, slope, position, (optional) dut]`. Without the fifth
/// entry DUT matching is disabled.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")
)]
pub struct Cuts {
    /// Coarse window on the raw outer-hit offsets of a doublet.
    pub doublet: Xy,
    /// Window on the middle-hit residual of a triplet.
    pub triplet: Xy,
    /// Window on the slope difference of two triplets.
    pub slope: Xy,
    /// Window on the position difference of two triplets at their mean z.
    pub position: Xy,
    /// Window on DUT hit residuals; `None` skips DUT matching.
    pub dut: Option<Xy>,
}

impl Default for Cuts {
    fn default() -> Self {
        Self {
            doublet: Xy::new(2.0, 2.0),
            triplet: Xy::new(0.1, 0.1),
            slope: Xy::new(0.005, 0.005),
            position: Xy::new(0.2, 0.2),
            dut: None,
        }
    }
}

impl Cuts {
    /// Builds cuts from the ordered pair sequence.
    ///
    /// # Errors
    ///
    /// Fails if fewer than four or more than five pairs are given, or if a
    /// value is negative or not finite.
    pub fn from_pairs(pairs: &[Xy]) -> Result<Self> {
        if pairs.len() < 4 {
            return Err(Error::InvalidCuts { found: pairs.len() });
        }
        if pairs.len() > 5 {
            return Err(Error::TooManyCuts { found: pairs.len() });
        }
        for (index, pair) in pairs.iter().enumerate() {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(pair.x) || !valid(pair.y) {
                return Err(Error::InvalidCut {
                    index,
                    x: pair.x,
                    y: pair.y,
                });
            }
        }

        Ok(Self {
            doublet: pairs[0],
            triplet: pairs[1],
            slope: pairs[2],
            position: pairs[3],
            dut: pairs.get(4).copied(),
        })
    }

    /// Returns the cuts as the ordered pair sequence.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<Xy> {
        let mut pairs = vec![self.doublet, self.triplet, self.slope, self.position];
        pairs.extend(self.dut);
        pairs
    }

    /// Sets the DUT window, enabling DUT matching.
    #[must_use]
    pub fn with_dut(mut self, window: Xy) -> Self {
        self.dut = Some(window);
        self
    }

    /// Removes the DUT window, disabling DUT matching.
    #[must_use]
    pub fn without_dut(mut self) -> Self {
        self.dut = None;
        self
    }
}

impl TryFrom<Vec<[f64; 2]>> for Cuts {
    type Error = Error;

    fn try_from(pairs: Vec<[f64; 2]>) -> Result<Self> {
        let pairs: Vec<Xy> = pairs.into_iter().map(|[x, y]| Xy::new(x, y)).collect();
        Self::from_pairs(&pairs)
    }
}

impl From<Cuts> for Vec<[f64; 2]> {
    fn from(cuts: Cuts) -> Self {
        cuts.to_pairs().into_iter().map(|p| [p.x, p.y]).collect()
    }
}

/// Scalar parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunParameters {
    /// Assumed charge over momentum.
    pub qbyp: f64,
    /// Magnetic deflection factors; zero turns the field off.
    pub bfac: Xy,
    /// z where the deflecting field begins.
    pub z_mag: f64,
    /// Beam energy, only written to the segment dump.
    pub beam_energy: f64,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            qbyp: 0.0,
            bfac: Xy::ZERO,
            z_mag: 0.0,
            beam_energy: 0.0,
        }
    }
}

impl RunParameters {
    /// Curvature assumed before any refinement: `qbyp * bfac`.
    #[must_use]
    pub fn initial_curvature(&self) -> Xy {
        Xy::new(self.qbyp * self.bfac.x, self.qbyp * self.bfac.y)
    }

    /// Returns true if a deflecting field is configured.
    #[must_use]
    pub fn field_on(&self) -> bool {
        !self.bfac.is_zero()
    }

    /// Checks that every parameter is finite.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first non-finite parameter.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("qbyp", self.qbyp),
            ("bfac.x", self.bfac.x),
            ("bfac.y", self.bfac.y),
            ("z_mag", self.z_mag),
            ("beam_energy", self.beam_energy),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(Error::ConfigError(format!("{name} must be finite, got {value}")));
            }
        }
        Ok(())
    }
}

/// Complete configuration of the track finder.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingConfig {
    pub cuts: Cuts,
    #[cfg_attr(feature = "serde", serde(default))]
    pub run: RunParameters,
}

impl TrackingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cut windows.
    #[must_use]
    pub fn with_cuts(mut self, cuts: Cuts) -> Self {
        self.cuts = cuts;
        self
    }

    /// Sets the assumed charge over momentum.
    #[must_use]
    pub fn with_qbyp(mut self, qbyp: f64) -> Self {
        self.run.qbyp = qbyp;
        self
    }

    /// Sets the magnetic deflection factors.
    #[must_use]
    pub fn with_bfac(mut self, bfac: Xy) -> Self {
        self.run.bfac = bfac;
        self
    }

    /// Sets the z where the field begins.
    #[must_use]
    pub fn with_z_mag(mut self, z_mag: f64) -> Self {
        self.run.z_mag = z_mag;
        self
    }

    /// Sets the beam energy.
    #[must_use]
    pub fn with_beam_energy(mut self, beam_energy: f64) -> Self {
        self.run.beam_energy = beam_energy;
        self
    }
}
