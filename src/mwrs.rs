//! MWRS multi-wavelength radial scans.
//!
//! # Layout
//! Big-endian throughout.  The header is a fixed 26 bytes:
//!
//! ```text
//! cell(u8) channel(u8) scan(u16) set_speed(u16) speed(u16)
//! temperature(i16, 0.1 °C) omega2t(f32) seconds(i32)
//! radius_count(u16) radius_start(u16, /1000) radius_step(u16, /10000)
//! lambda_count(u16)
//! ```
//!
//! followed by `lambda_count` u16 wavelength tags and `lambda_count` blocks of
//! `radius_count` 32-bit intensities, one block per wavelength.
//!
//! The decoder reads intensities as signed; the encoder writes them as
//! unsigned counts above each block's own minimum (never above 0), at 10000
//! counts per unit.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::field::{channel_byte, channel_char, narrow, round_i16, round_u16};
use crate::quantize::Quantizer;

pub const HEADER_SIZE: usize = 26;
/// Intensity counts per unit on the encode path.
pub const INTENSITY_SCALE: f64 = 10_000.0;
pub const TEMPERATURE_SCALE: f64 = 10.0;
pub const RADIUS_START_SCALE: f64 = 1_000.0;
pub const RADIUS_STEP_SCALE: f64 = 10_000.0;

/// Scalar part of an MWRS scan, in engineering units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MwrsHeader {
    pub cell:         u8,
    pub channel:      char,
    pub scan:         u16,
    pub set_speed:    u16,
    pub speed:        u16,
    /// °C
    pub temperature:  f64,
    pub omega2t:      f32,
    pub seconds:      i32,
    pub radius_count: u16,
    pub radius_start: f64,
    pub radius_step:  f64,
    pub wavelengths:  Vec<u16>,
}

impl MwrsHeader {
    /// Radial position of point `index`.
    pub fn radius_at(&self, index: usize) -> f64 {
        self.radius_start + index as f64 * self.radius_step
    }

    fn read<R: Read>(mut reader: R) -> Result<Self> {
        let cell          = reader.read_u8()?;
        let channel       = channel_char(reader.read_u8()?)?;
        let scan          = reader.read_u16::<BigEndian>()?;
        let set_speed     = reader.read_u16::<BigEndian>()?;
        let speed         = reader.read_u16::<BigEndian>()?;
        let temperature   = reader.read_i16::<BigEndian>()? as f64 / TEMPERATURE_SCALE;
        let omega2t       = reader.read_f32::<BigEndian>()?;
        let seconds       = reader.read_i32::<BigEndian>()?;
        let radius_count  = reader.read_u16::<BigEndian>()?;
        let radius_start  = reader.read_u16::<BigEndian>()? as f64 / RADIUS_START_SCALE;
        let radius_step   = reader.read_u16::<BigEndian>()? as f64 / RADIUS_STEP_SCALE;
        let lambda_count  = reader.read_u16::<BigEndian>()?;

        let mut wavelengths = Vec::with_capacity(lambda_count as usize);
        for _ in 0..lambda_count {
            wavelengths.push(reader.read_u16::<BigEndian>()?);
        }

        Ok(Self {
            cell,
            channel,
            scan,
            set_speed,
            speed,
            temperature,
            omega2t,
            seconds,
            radius_count,
            radius_start,
            radius_step,
            wavelengths,
        })
    }

    fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u8(self.cell)?;
        writer.write_u8(channel_byte(self.channel)?)?;
        writer.write_u16::<BigEndian>(self.scan)?;
        writer.write_u16::<BigEndian>(self.set_speed)?;
        writer.write_u16::<BigEndian>(self.speed)?;
        writer.write_i16::<BigEndian>(round_i16(self.temperature * TEMPERATURE_SCALE, "temperature")?)?;
        writer.write_f32::<BigEndian>(self.omega2t)?;
        writer.write_i32::<BigEndian>(self.seconds)?;
        writer.write_u16::<BigEndian>(self.radius_count)?;
        writer.write_u16::<BigEndian>(round_u16(self.radius_start * RADIUS_START_SCALE, "radius_start")?)?;
        writer.write_u16::<BigEndian>(round_u16(self.radius_step * RADIUS_STEP_SCALE, "radius_step")?)?;
        writer.write_u16::<BigEndian>(narrow(self.wavelengths.len(), "lambda_count")?)?;
        for &tag in &self.wavelengths {
            writer.write_u16::<BigEndian>(tag)?;
        }
        Ok(())
    }
}

/// A decoded MWRS file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MwrsRecord {
    #[serde(flatten)]
    pub header:      MwrsHeader,
    /// `intensities[wavelength][radius]`, raw counts.
    pub intensities: Vec<Vec<i32>>,
}

impl MwrsRecord {
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let header = MwrsHeader::read(&mut reader)?;
        let radius_count = header.radius_count as usize;

        let mut intensities = Vec::with_capacity(header.wavelengths.len());
        for _ in &header.wavelengths {
            let mut block = Vec::with_capacity(radius_count);
            for _ in 0..radius_count {
                block.push(reader.read_i32::<BigEndian>()?);
            }
            intensities.push(block);
        }

        debug!(
            "decoded MWRS cell {} channel {} scan {}: {} wavelengths x {} points",
            header.cell,
            header.channel,
            header.scan,
            header.wavelengths.len(),
            radius_count,
        );
        Ok(Self { header, intensities })
    }
}

// ── Encode ──────────────────────────────────────────────────────────────────

/// Serialize one scan.  `intensities` holds one block of `radius_count`
/// values per wavelength tag.
pub fn to_bytes(header: &MwrsHeader, intensities: &[Vec<f64>]) -> Result<Vec<u8>> {
    if intensities.len() != header.wavelengths.len() {
        return Err(Error::SizeMismatch {
            what:     "intensity blocks",
            declared: header.wavelengths.len(),
            actual:   intensities.len(),
        });
    }
    if let Some(block) = intensities.iter().find(|b| b.len() != header.radius_count as usize) {
        return Err(Error::SizeMismatch {
            what:     "intensity block length",
            declared: header.radius_count as usize,
            actual:   block.len(),
        });
    }

    let mut out = Vec::with_capacity(
        HEADER_SIZE + 2 * header.wavelengths.len() + 4 * intensities.iter().map(Vec::len).sum::<usize>(),
    );
    header.write(&mut out)?;
    for block in intensities {
        let block_min = block.iter().copied().fold(0.0, f64::min);
        let quantizer = Quantizer::scaled(block_min, INTENSITY_SCALE);
        for &value in block {
            out.write_u32::<BigEndian>(quantizer.quantize_u32(value, "intensity")?)?;
        }
    }

    debug!("encoded MWRS scan {}: {} bytes", header.scan, out.len());
    Ok(out)
}

pub fn write<W: Write>(mut writer: W, header: &MwrsHeader, intensities: &[Vec<f64>]) -> Result<u64> {
    let bytes = to_bytes(header, intensities)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len() as u64)
}

// ── File entry points ───────────────────────────────────────────────────────

pub fn decode<P: AsRef<Path>>(path: P) -> Result<MwrsRecord> {
    let bytes = fs::read(path)?;
    MwrsRecord::read(bytes.as_slice())
}

pub fn encode<P: AsRef<Path>>(path: P, header: &MwrsHeader, intensities: &[Vec<f64>]) -> Result<u64> {
    let bytes = to_bytes(header, intensities)?;
    fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}
