//! MW multi-wavelength export files (encode only).
//!
//! # Layout
//! Big-endian throughout.
//!
//! ```text
//! magic(u32) timestamp(48 bit) version(u16) cell(u8) channel(u8) scan(u16)
//! sample(64, NUL-padded) speed(u16) temperature(u16, 0.1 °C)
//! w2t(u32, input / 1000) seconds(u32) radius_count(u16)
//! radius_start(u16, ×100) radius_end(u16, ×100) lambda_count(u16)
//! lambda_count × wavelength(u16, 0.1 nm)
//! lambda_count × radius_count × intensity(u32)
//! ```
//!
//! Readers seek to `100 + 2 * lambda_count` for the intensity block.  The
//! fixed fields above come to exactly 100 bytes, so no padding is written;
//! [`align_header`] still checks the length before any intensity is emitted.

use std::fs;
use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{self, channel_byte, narrow, round_u16, round_u32};

/// Size of the fixed fields; the intensity block starts at `HEADER_SIZE + 2L`.
pub const HEADER_SIZE: usize = 100;
/// Fixed part two bytes short of [`HEADER_SIZE`]; [`align_header`] pads it.
pub const PACKED_HEADER_SIZE: usize = 98;
pub const SAMPLE_LEN: usize = 64;
pub const MAX_TIMESTAMP: u64 = (1 << 48) - 1;

/// Everything needed for one MW file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MwDataset {
    pub magic:        u32,
    /// 48-bit acquisition timestamp.
    pub timestamp:    u64,
    pub version:      u16,
    pub cell:         u8,
    pub channel:      char,
    pub scan:         u16,
    pub sample:       String,
    /// rpm, rounded on write
    pub speed:        f64,
    /// °C
    pub temperature:  f64,
    /// Pre-scaled ω²t; stored divided by 1000.
    pub w2t:          f64,
    pub seconds:      f64,
    pub radius_count: u16,
    /// mm
    pub radius_start: f64,
    /// mm
    pub radius_end:   f64,
    /// nm
    pub wavelengths:  Vec<f64>,
    /// `intensities[wavelength][radius]`
    pub intensities:  Vec<Vec<i64>>,
}

/// Bring a header of `98 + 2L` bytes up to `100 + 2L`.
///
/// A header that is already `100 + 2L` bytes is left alone; any other length
/// is a [`Error::HeaderSize`].
pub fn align_header(header: &mut Vec<u8>, lambda_count: usize) -> Result<()> {
    let table = 2 * lambda_count;
    match header.len() {
        n if n == PACKED_HEADER_SIZE + table => {
            header.extend_from_slice(&[0, 0]);
            Ok(())
        }
        n if n == HEADER_SIZE + table => Ok(()),
        n => Err(Error::HeaderSize { actual: n, expected: HEADER_SIZE + table }),
    }
}

impl MwDataset {
    fn check_intensities(&self) -> Result<()> {
        if self.intensities.len() != self.wavelengths.len() {
            return Err(Error::SizeMismatch {
                what:     "intensity rows",
                declared: self.wavelengths.len(),
                actual:   self.intensities.len(),
            });
        }
        for row in &self.intensities {
            if row.len() != self.radius_count as usize {
                return Err(Error::SizeMismatch {
                    what:     "intensity row length",
                    declared: self.radius_count as usize,
                    actual:   row.len(),
                });
            }
            if let Some(v) = row.iter().find(|v| !(0..=u32::MAX as i64).contains(*v)) {
                return Err(Error::value_range("intensity", v));
            }
        }
        Ok(())
    }

    /// Header fields and wavelength table exactly as laid out.
    fn packed_header(&self) -> Result<Vec<u8>> {
        if self.timestamp > MAX_TIMESTAMP {
            return Err(Error::value_range("timestamp", self.timestamp));
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + 2 * self.wavelengths.len());
        out.write_u32::<BigEndian>(self.magic)?;
        out.write_u48::<BigEndian>(self.timestamp)?;
        out.write_u16::<BigEndian>(self.version)?;
        out.write_u8(self.cell)?;
        out.write_u8(channel_byte(self.channel)?)?;
        out.write_u16::<BigEndian>(self.scan)?;
        field::write_fixed(&mut out, &self.sample, SAMPLE_LEN)?;
        out.write_u16::<BigEndian>(round_u16(self.speed, "speed")?)?;
        out.write_u16::<BigEndian>(round_u16(self.temperature * 10.0, "temperature")?)?;
        out.write_u32::<BigEndian>(round_u32(self.w2t / 1000.0, "w2t")?)?;
        out.write_u32::<BigEndian>(round_u32(self.seconds, "seconds")?)?;
        out.write_u16::<BigEndian>(self.radius_count)?;
        out.write_u16::<BigEndian>(round_u16(self.radius_start * 100.0, "radius_start")?)?;
        out.write_u16::<BigEndian>(round_u16(self.radius_end * 100.0, "radius_end")?)?;
        out.write_u16::<BigEndian>(narrow(self.wavelengths.len(), "lambda_count")?)?;
        for &wl in &self.wavelengths {
            out.write_u16::<BigEndian>(round_u16(wl * 10.0, "wavelength")?)?;
        }
        Ok(out)
    }

    fn header_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.packed_header()?;
        align_header(&mut out, self.wavelengths.len())?;
        Ok(out)
    }

    /// Serialize into a complete file image.  Nothing is produced unless
    /// every field and intensity fits.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.header_bytes()?;
        self.check_intensities()?;

        out.reserve(4 * self.wavelengths.len() * self.radius_count as usize);
        for row in &self.intensities {
            for &v in row {
                out.write_u32::<BigEndian>(v as u32)?;
            }
        }

        debug!(
            "encoded MW cell {} channel {} scan {}: {} wavelengths x {} points, {} bytes",
            self.cell,
            self.channel,
            self.scan,
            self.wavelengths.len(),
            self.radius_count,
            out.len(),
        );
        Ok(out)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<u64> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }
}

pub fn encode<P: AsRef<Path>>(path: P, dataset: &MwDataset) -> Result<u64> {
    let bytes = dataset.to_bytes()?;
    fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}
