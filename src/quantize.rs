//! Affine fixed-point quantization.
//!
//! Two call sites use two different range policies:
//!
//! | Format | Origin            | Resolution                       |
//! |--------|-------------------|----------------------------------|
//! | AUC    | global data min   | `(max - min) / 65535` per count  |
//! | MWRS   | per-block min (≤0)| 10000 counts per unit            |
//!
//! Both are expressed as a [`Quantizer`] built by the caller for the range it
//! owns.  Rounding is half-to-even so that files written here match the
//! existing laboratory tooling bit for bit.

use crate::error::{Error, Result};

/// Full scale of a 16-bit reading.
pub const U16_LEVELS: f64 = 65535.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Resolution {
    /// Engineering units per count; quantize divides by it.
    Step(f64),
    /// Counts per engineering unit; quantize multiplies by it.
    Gain(f64),
}

/// Maps engineering values onto integer counts and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    origin:     f64,
    resolution: Resolution,
}

impl Quantizer {
    /// Spread `[min, max]` evenly over `levels` counts.
    pub fn spanning(min: f64, max: f64, levels: f64) -> Self {
        Self { origin: min, resolution: Resolution::Step((max - min) / levels) }
    }

    /// Fixed gain of `counts_per_unit` counts per engineering unit above `origin`.
    pub fn scaled(origin: f64, counts_per_unit: f64) -> Self {
        Self { origin, resolution: Resolution::Gain(counts_per_unit) }
    }

    pub fn origin(&self) -> f64 { self.origin }

    /// Size of one count in engineering units.
    pub fn step(&self) -> f64 {
        match self.resolution {
            Resolution::Step(s) => s,
            Resolution::Gain(g) => 1.0 / g,
        }
    }

    /// Unbounded rounded count for `value`.
    ///
    /// A zero-width span has no resolution; every value maps to count 0.
    pub fn quantize(&self, value: f64) -> f64 {
        let offset = value - self.origin;
        let counts = match self.resolution {
            Resolution::Step(s) if s == 0.0 => return 0.0,
            Resolution::Step(s) => offset / s,
            Resolution::Gain(g) => offset * g,
        };
        counts.round_ties_even()
    }

    pub fn quantize_u16(&self, value: f64, field: &'static str) -> Result<u16> {
        let q = self.quantize(value);
        if !(0.0..=u16::MAX as f64).contains(&q) {
            return Err(Error::value_range(field, value));
        }
        Ok(q as u16)
    }

    pub fn quantize_u32(&self, value: f64, field: &'static str) -> Result<u32> {
        let q = self.quantize(value);
        if !(0.0..=u32::MAX as f64).contains(&q) {
            return Err(Error::value_range(field, value));
        }
        Ok(q as u32)
    }

    /// Engineering value for a stored count.
    pub fn dequantize(&self, raw: f64) -> f64 {
        match self.resolution {
            Resolution::Step(s) => self.origin + s * raw,
            Resolution::Gain(g) => self.origin + raw / g,
        }
    }
}
