//! Level-to-volume interpolation through a calibration curve
//!
//! Tanks are rarely straight-walled, so a fill level in segments does
//! not map linearly to a volume. Deployments measure a handful of
//! (level, volume) breakpoints and the estimator interpolates between
//! them. Curves are defined empty-to-full; the `invert` flag reads the
//! same curve full-to-empty by subtracting the result from the final
//! breakpoint's volume (the total capacity).

use crate::errors::CurveError;

/// Maximum number of calibration breakpoints a curve can store.
pub const MAX_CURVE_POINTS: usize = 16;

/// One calibration breakpoint: at fill level `level` the tank holds
/// `volume` liters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    /// Fill level in segments from the tank bottom.
    pub level: f32,
    /// Volume in liters.
    pub volume: f32,
}

impl CurvePoint {
    /// Creates a breakpoint.
    pub const fn new(level: f32, volume: f32) -> Self {
        Self { level, volume }
    }
}

/// Piecewise-linear level-to-volume calibration curve.
///
/// Breakpoints are validated once at construction and immutable
/// afterwards: finite values, monotonic non-decreasing in level and in
/// volume, nothing negative. Deserialization goes through the same
/// validation, so a curve loaded from configuration upholds the
/// invariant too.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UncheckedCurve"))]
pub struct VolumeCurve {
    points: heapless::Vec<CurvePoint, MAX_CURVE_POINTS>,
    invert: bool,
}

/// Raw mirror of [`VolumeCurve`] as it appears in configuration;
/// promoted through [`VolumeCurve::new`] so invalid breakpoints are
/// rejected at load time.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct UncheckedCurve {
    points: heapless::Vec<CurvePoint, MAX_CURVE_POINTS>,
    #[serde(default)]
    invert: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedCurve> for VolumeCurve {
    type Error = CurveError;

    fn try_from(raw: UncheckedCurve) -> Result<Self, Self::Error> {
        Self::new(&raw.points, raw.invert)
    }
}

impl VolumeCurve {
    /// Builds a curve from breakpoints sorted ascending by level.
    pub fn new(points: &[CurvePoint], invert: bool) -> Result<Self, CurveError> {
        let mut prev = CurvePoint::new(0.0, 0.0);
        for point in points {
            if !point.level.is_finite() || !point.volume.is_finite() {
                return Err(CurveError::NonFinite);
            }
            if point.level < prev.level || point.volume < prev.volume {
                return Err(CurveError::NotMonotonic);
            }
            prev = *point;
        }
        let points = heapless::Vec::from_slice(points).map_err(|_| CurveError::TooManyPoints {
            max: MAX_CURVE_POINTS,
        })?;
        Ok(Self { points, invert })
    }

    /// The validated breakpoints.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Whether results are reported as remaining capacity.
    pub fn invert(&self) -> bool {
        self.invert
    }

    /// Interpolates a volume for `level`.
    ///
    /// `None` in (failed read) gives `None` out, never a numeric
    /// clamp; the same holds for a NaN level or a curve with fewer
    /// than two breakpoints. Levels outside the calibrated range clamp
    /// to the nearest endpoint's volume rather than extrapolating.
    pub fn estimate(&self, level: Option<f32>) -> Option<f32> {
        let level = level?;
        if level.is_nan() || self.points.len() < 2 {
            return None;
        }

        let last = self.points[self.points.len() - 1];
        let mut i = 0;
        let volume = loop {
            if level < self.points[i].level {
                if i == 0 {
                    break self.points[0].volume;
                }
                let low = self.points[i - 1];
                let high = self.points[i];
                break low.volume
                    + (level - low.level) / (high.level - low.level) * (high.volume - low.volume);
            }
            i += 1;
            if i == self.points.len() {
                break last.volume;
            }
        };

        Some(if self.invert { last.volume - volume } else { volume })
    }
}

/// Converts US gallons to liters, for deployments calibrated in
/// gallons.
pub fn gallons_to_liters(gallons: f32) -> f32 {
    gallons * crate::constants::LITERS_PER_GALLON
}
