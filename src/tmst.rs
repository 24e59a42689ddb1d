//! TMST time-state telemetry.
//!
//! # Layout
//! Big-endian.  A 6-byte header (4-byte ASCII magic, major and minor
//! version) is followed by fixed 24-byte records:
//!
//! ```text
//! time(u32) raw_speed(f32) set_speed(u32) omega2t(f32) temperature(f32)
//! step(u16) scan(u16)
//! ```
//!
//! The record count is not stored.  Records are read until fewer than 24
//! bytes remain; a trailing partial record is dropped, not reported.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};
use serde::Serialize;

use crate::error::Result;
use crate::field::read_array;

pub const RECORD_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TmstRecord {
    pub time:        u32,
    pub raw_speed:   f32,
    pub set_speed:   u32,
    pub omega2t:     f32,
    pub temperature: f32,
    pub step:        u16,
    pub scan:        u16,
}

impl TmstRecord {
    fn from_bytes(buf: &[u8; RECORD_SIZE]) -> io::Result<Self> {
        let mut r = &buf[..];
        Ok(Self {
            time:        r.read_u32::<BigEndian>()?,
            raw_speed:   r.read_f32::<BigEndian>()?,
            set_speed:   r.read_u32::<BigEndian>()?,
            omega2t:     r.read_f32::<BigEndian>()?,
            temperature: r.read_f32::<BigEndian>()?,
            step:        r.read_u16::<BigEndian>()?,
            scan:        r.read_u16::<BigEndian>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmstDataset {
    pub magic:         String,
    pub major_version: u8,
    pub minor_version: u8,
    pub records:       Vec<TmstRecord>,
}

/// Fill as much of `buf` as the stream allows; returns the byte count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl TmstDataset {
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let magic: [u8; 4] = read_array(&mut reader)?;
        let magic = String::from_utf8_lossy(&magic).into_owned();
        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;

        let mut records = Vec::new();
        let mut buf = [0u8; RECORD_SIZE];
        loop {
            let n = read_up_to(&mut reader, &mut buf)?;
            if n < RECORD_SIZE {
                if n > 0 {
                    warn!("TMST: dropping {n} trailing bytes after {} records", records.len());
                }
                break;
            }
            records.push(TmstRecord::from_bytes(&buf)?);
        }

        debug!(
            "decoded TMST {magic:?} v{major_version}.{minor_version}: {} records",
            records.len()
        );
        Ok(Self { magic, major_version, minor_version, records })
    }
}

pub fn decode<P: AsRef<Path>>(path: P) -> Result<TmstDataset> {
    TmstDataset::read(BufReader::new(File::open(path)?))
}
