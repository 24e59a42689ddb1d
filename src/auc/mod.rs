//! AUC scan-series files (`*.auc`).
//!
//! # Layout
//! All multi-byte numbers are little-endian.
//!
//! ```text
//! "UCDA"  version(2 ASCII)  type(2 ASCII)  cell(u8)  channel(u8)
//! reserved(16)  description(240, NUL-padded)
//! min_radius(f32)  unused(f32)  delta_radius(f32)
//! min1(f32)  max1(f32)  min2(f32)  max2(f32)  scan_count(i16)
//! scan_count × {
//!     "DATA"  temperature(f32)  speed(f32)  seconds(i32)  omega2t(f32)
//!     wavelength_code(i16)  radius_step(f32)  value_count(i32)
//!     value_count × { reading(u16) [stddev(u16) when min2/max2 ≠ 0] }
//!     interpolated((value_count + 7) / 8 bytes, one flag per byte)
//! }
//! ```
//!
//! The flag block is sized like a packed bitmap but each byte carries the
//! flag of exactly one position (`byte & 1`).
//!
//! The encoder always writes version 5, experiment type `IP` and a zero
//! secondary range, whatever the dataset says.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::field::{self, channel_byte, channel_char, narrow, read_array, read_padded_str, round_i16};
use crate::quantize::{Quantizer, U16_LEVELS};

pub const MAGIC: &[u8; 4] = b"UCDA";
pub const SCAN_MARKER: &[u8; 4] = b"DATA";
/// Highest version this decoder accepts.
pub const MAX_VERSION: u8 = 5;
/// Version written by the encoder.
pub const WRITE_VERSION: &[u8; 2] = b"05";
pub const RESERVED_LEN: usize = 16;
pub const DESCRIPTION_LEN: usize = 240;

// ── Experiment type ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExperimentType {
    /// Radial absorbance
    Ra,
    /// Interference
    Ip,
    /// Radial intensity
    Ri,
    /// Fluorescence
    Fi,
    /// Wavelength absorbance
    Wa,
    /// Wavelength intensity
    Wi,
}

impl ExperimentType {
    pub fn code(self) -> &'static [u8; 2] {
        match self {
            ExperimentType::Ra => b"RA",
            ExperimentType::Ip => b"IP",
            ExperimentType::Ri => b"RI",
            ExperimentType::Fi => b"FI",
            ExperimentType::Wa => b"WA",
            ExperimentType::Wi => b"WI",
        }
    }

    pub fn from_code(code: &[u8; 2]) -> Option<Self> {
        match code {
            b"RA" => Some(ExperimentType::Ra),
            b"IP" => Some(ExperimentType::Ip),
            b"RI" => Some(ExperimentType::Ri),
            b"FI" => Some(ExperimentType::Fi),
            b"WA" => Some(ExperimentType::Wa),
            b"WI" => Some(ExperimentType::Wi),
            _     => None,
        }
    }
}

/// Wavelength in nm from its on-disk code.  Version 5 stores tenths of a nm;
/// earlier versions store hundredths above 180 nm.
pub fn wavelength_from_code(version: u8, code: i16) -> f64 {
    if version > 4 {
        code as f64 / 10.0
    } else {
        code as f64 / 100.0 + 180.0
    }
}

/// Bytes occupied by the interpolation flags of `value_count` readings.
pub fn flag_block_len(value_count: usize) -> usize {
    value_count.div_ceil(8)
}

// ── Records ─────────────────────────────────────────────────────────────────

/// One radial sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRecord {
    /// °C
    pub temperature:  f64,
    /// rpm
    pub speed:        f64,
    pub seconds:      i32,
    pub omega2t:      f64,
    /// nm
    pub wavelength:   f64,
    pub radius_step:  f64,
    pub readings:     Vec<f64>,
    /// Present only when the dataset has a nonzero secondary range.
    pub std_devs:     Option<Vec<f64>>,
    /// One entry per byte of the flag block.
    pub interpolated: Vec<bool>,
}

impl ScanRecord {
    pub fn value_count(&self) -> usize {
        self.readings.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AucDataset {
    pub version:         u8,
    pub experiment_type: ExperimentType,
    pub cell:            u8,
    pub channel:         char,
    pub description:     String,
    pub min_radius:      f64,
    pub delta_radius:    f64,
    pub primary_min:     f64,
    pub primary_max:     f64,
    pub secondary_min:   f64,
    pub secondary_max:   f64,
    pub scans:           Vec<ScanRecord>,
}

impl AucDataset {
    /// Readings per scan, taken from the last scan (0 without scans).
    pub fn value_count(&self) -> usize {
        self.scans.last().map_or(0, ScanRecord::value_count)
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary_min != 0.0 || self.secondary_max != 0.0
    }

    /// Radial position of reading `index`.
    pub fn radius_at(&self, index: usize) -> f64 {
        self.min_radius + index as f64 * self.delta_radius
    }

    /// Radius vector derived from `min_radius` and `delta_radius`.
    pub fn radius(&self) -> Vec<f64> {
        (0..self.value_count()).map(|j| self.radius_at(j)).collect()
    }

    /// Check that every secondary array matches its primary array.
    pub fn validate(&self) -> Result<()> {
        for scan in &self.scans {
            if let Some(sd) = &scan.std_devs {
                if sd.len() != scan.readings.len() {
                    return Err(Error::SizeMismatch {
                        what:     "standard deviation readings",
                        declared: scan.readings.len(),
                        actual:   sd.len(),
                    });
                }
            }
        }
        Ok(())
    }

    // ── Decode ──────────────────────────────────────────────────────────────

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let magic: [u8; 4] = read_array(&mut reader)?;
        if &magic != MAGIC {
            return Err(Error::InvalidMagic {
                expected: "UCDA",
                found:    String::from_utf8_lossy(&magic).into_owned(),
            });
        }

        let version_raw: [u8; 2] = read_array(&mut reader)?;
        let version_str = String::from_utf8_lossy(&version_raw).into_owned();
        let version = match version_str.parse::<u8>() {
            Ok(v) if v <= MAX_VERSION => v,
            _ => return Err(Error::UnsupportedVersion(version_str)),
        };

        let type_raw: [u8; 2] = read_array(&mut reader)?;
        let experiment_type = ExperimentType::from_code(&type_raw).ok_or_else(|| {
            Error::InvalidExperimentType(String::from_utf8_lossy(&type_raw).into_owned())
        })?;

        let cell = reader.read_u8()?;
        let channel = channel_char(reader.read_u8()?)?;
        let _reserved: [u8; RESERVED_LEN] = read_array(&mut reader)?;
        let description = read_padded_str(&mut reader, DESCRIPTION_LEN)?;

        let min_radius    = reader.read_f32::<LittleEndian>()? as f64;
        let _unused       = reader.read_f32::<LittleEndian>()?;
        let delta_radius  = reader.read_f32::<LittleEndian>()? as f64;
        let primary_min   = reader.read_f32::<LittleEndian>()? as f64;
        let primary_max   = reader.read_f32::<LittleEndian>()? as f64;
        let secondary_min = reader.read_f32::<LittleEndian>()? as f64;
        let secondary_max = reader.read_f32::<LittleEndian>()? as f64;
        let scan_count    = reader.read_i16::<LittleEndian>()?;

        let primary = Quantizer::spanning(primary_min, primary_max, U16_LEVELS);
        let secondary = (secondary_min != 0.0 || secondary_max != 0.0)
            .then(|| Quantizer::spanning(secondary_min, secondary_max, U16_LEVELS));

        // A negative count yields no scans.
        let scan_count = scan_count.max(0) as usize;
        let mut scans = Vec::with_capacity(scan_count);
        for index in 0..scan_count {
            scans.push(read_scan(&mut reader, index, version, &primary, secondary.as_ref())?);
        }

        let dataset = AucDataset {
            version,
            experiment_type,
            cell,
            channel,
            description,
            min_radius,
            delta_radius,
            primary_min,
            primary_max,
            secondary_min,
            secondary_max,
            scans,
        };
        debug!(
            "decoded AUC v{} {:?} cell {} channel {}: {} scans x {} readings",
            dataset.version,
            dataset.experiment_type,
            dataset.cell,
            dataset.channel,
            dataset.scans.len(),
            dataset.value_count(),
        );
        Ok(dataset)
    }

    // ── Encode ──────────────────────────────────────────────────────────────

    /// Serialize into a complete file image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut out = Vec::new();
        out.write_all(MAGIC)?;
        out.write_all(WRITE_VERSION)?;
        out.write_all(ExperimentType::Ip.code())?;
        out.write_u8(self.cell)?;
        out.write_u8(channel_byte(self.channel)?)?;
        out.write_all(&[0u8; RESERVED_LEN])?;
        field::write_fixed(&mut out, &self.description, DESCRIPTION_LEN)?;

        let min_radius = self.radius().into_iter().fold(self.min_radius, f64::min);
        let delta_radius = if self.scans.is_empty() {
            self.delta_radius
        } else {
            self.scans.iter().map(|s| s.radius_step).sum::<f64>() / self.scans.len() as f64
        };
        // The decoder only sees the stored f32 range, so quantize against it.
        let (min, max) = self.reading_range();
        let min = field::f32_at_or_below(min, "reading")?;
        let max = field::f32_at_or_above(max, "reading")?;

        out.write_f32::<LittleEndian>(min_radius as f32)?;
        out.write_f32::<LittleEndian>(0.0)?;
        out.write_f32::<LittleEndian>(delta_radius as f32)?;
        out.write_f32::<LittleEndian>(min)?;
        out.write_f32::<LittleEndian>(max)?;
        out.write_f32::<LittleEndian>(0.0)?;
        out.write_f32::<LittleEndian>(0.0)?;
        out.write_i16::<LittleEndian>(narrow(self.scans.len(), "scan_count")?)?;

        let quantizer = Quantizer::spanning(min as f64, max as f64, U16_LEVELS);
        for scan in &self.scans {
            write_scan(&mut out, scan, &quantizer)?;
        }

        debug!("encoded AUC: {} scans, {} bytes", self.scans.len(), out.len());
        Ok(out)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<u64> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Global min/max over every reading of every scan; `(0, 0)` when empty.
    fn reading_range(&self) -> (f64, f64) {
        let mut values = self.scans.iter().flat_map(|s| s.readings.iter().copied());
        match values.next() {
            None => (0.0, 0.0),
            Some(first) => values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))),
        }
    }
}

fn read_scan<R: Read>(
    mut reader: R,
    index:      usize,
    version:    u8,
    primary:    &Quantizer,
    secondary:  Option<&Quantizer>,
) -> Result<ScanRecord> {
    let marker: [u8; 4] = read_array(&mut reader)?;
    if &marker != SCAN_MARKER {
        return Err(Error::BadScanMarker {
            scan:  index,
            found: String::from_utf8_lossy(&marker).into_owned(),
        });
    }

    let temperature = reader.read_f32::<LittleEndian>()? as f64;
    let speed       = reader.read_f32::<LittleEndian>()? as f64;
    let seconds     = reader.read_i32::<LittleEndian>()?;
    let omega2t     = reader.read_f32::<LittleEndian>()? as f64;
    let wavelength  = wavelength_from_code(version, reader.read_i16::<LittleEndian>()?);
    let radius_step = reader.read_f32::<LittleEndian>()? as f64;
    let value_count = reader.read_i32::<LittleEndian>()?;
    let value_count: usize = narrow(value_count, "value_count")?;

    // Capacity is capped; a corrupt count must not trigger a huge allocation.
    let capacity = value_count.min(1 << 16);
    let mut readings = Vec::with_capacity(capacity);
    let mut std_devs = secondary.map(|_| Vec::with_capacity(capacity));
    for _ in 0..value_count {
        let raw = reader.read_u16::<LittleEndian>()?;
        readings.push(primary.dequantize(raw as f64));
        if let (Some(q), Some(sd)) = (secondary, std_devs.as_mut()) {
            let raw = reader.read_u16::<LittleEndian>()?;
            sd.push(q.dequantize(raw as f64));
        }
    }

    let mut flags = vec![0u8; flag_block_len(value_count)];
    reader.read_exact(&mut flags)?;
    let interpolated = flags.iter().map(|b| (b & 1) == 1).collect();

    Ok(ScanRecord {
        temperature,
        speed,
        seconds,
        omega2t,
        wavelength,
        radius_step,
        readings,
        std_devs,
        interpolated,
    })
}

fn write_scan<W: Write>(mut writer: W, scan: &ScanRecord, quantizer: &Quantizer) -> Result<()> {
    writer.write_all(SCAN_MARKER)?;
    writer.write_f32::<LittleEndian>(scan.temperature as f32)?;
    writer.write_f32::<LittleEndian>(scan.speed as f32)?;
    writer.write_i32::<LittleEndian>(scan.seconds)?;
    writer.write_f32::<LittleEndian>(scan.omega2t as f32)?;
    writer.write_i16::<LittleEndian>(round_i16(scan.wavelength * 10.0, "wavelength")?)?;
    writer.write_f32::<LittleEndian>(scan.radius_step as f32)?;
    writer.write_i32::<LittleEndian>(narrow(scan.readings.len(), "value_count")?)?;
    for &value in &scan.readings {
        writer.write_u16::<LittleEndian>(quantizer.quantize_u16(value, "reading")?)?;
    }
    writer.write_all(&vec![0u8; flag_block_len(scan.readings.len())])?;
    Ok(())
}

// ── File entry points ───────────────────────────────────────────────────────

pub fn decode<P: AsRef<Path>>(path: P) -> Result<AucDataset> {
    let bytes = fs::read(path)?;
    AucDataset::read(bytes.as_slice())
}

/// Write `dataset` to `path`; returns the number of bytes written.
pub fn encode<P: AsRef<Path>>(path: P, dataset: &AucDataset) -> Result<u64> {
    let bytes = dataset.to_bytes()?;
    fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}
