//! Fixed-width field helpers shared by the codecs.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// `s` as exactly `width` bytes: truncated when longer, NUL-padded when shorter.
pub fn fixed_bytes(s: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = s.as_bytes().iter().copied().take(width).collect();
    out.resize(width, 0);
    out
}

pub fn write_fixed<W: Write>(mut writer: W, s: &str, width: usize) -> Result<()> {
    writer.write_all(&fixed_bytes(s, width))?;
    Ok(())
}

/// Read `N` bytes.
pub fn read_array<R: Read, const N: usize>(mut reader: R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a NUL-padded text field, stripping padding from both ends.
pub fn read_padded_str<R: Read>(mut reader: R, width: usize) -> Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim_matches('\0').to_string())
}

/// One-byte channel identifier.
pub fn channel_byte(channel: char) -> Result<u8> {
    if channel.is_ascii() {
        Ok(channel as u8)
    } else {
        Err(Error::value_range("channel", channel))
    }
}

/// Channel identifier from its stored byte; the inverse of [`channel_byte`].
pub fn channel_char(byte: u8) -> Result<char> {
    if byte.is_ascii() {
        Ok(byte as char)
    } else {
        Err(Error::value_range("channel", format!("{byte:#04x}")))
    }
}

// ── Outward f32 rounding ────────────────────────────────────────────────────

/// Largest finite `f32` that is `<= value`.
pub fn f32_at_or_below(value: f64, field: &'static str) -> Result<f32> {
    let f = finite_f32(value, field)?;
    if (f as f64) <= value {
        return Ok(f);
    }
    // One step toward negative infinity.
    let below = if f == 0.0 {
        -f32::from_bits(1)
    } else if f > 0.0 {
        f32::from_bits(f.to_bits() - 1)
    } else {
        f32::from_bits(f.to_bits() + 1)
    };
    if !below.is_finite() {
        return Err(Error::value_range(field, value));
    }
    Ok(below)
}

/// Smallest finite `f32` that is `>= value`.
pub fn f32_at_or_above(value: f64, field: &'static str) -> Result<f32> {
    Ok(-f32_at_or_below(-value, field)?)
}

fn finite_f32(value: f64, field: &'static str) -> Result<f32> {
    let f = value as f32;
    if !f.is_finite() {
        return Err(Error::value_range(field, value));
    }
    Ok(f)
}

// ── Checked rounding into integer fields ────────────────────────────────────

pub fn round_u16(value: f64, field: &'static str) -> Result<u16> {
    let r = value.round_ties_even();
    if !(0.0..=u16::MAX as f64).contains(&r) {
        return Err(Error::value_range(field, value));
    }
    Ok(r as u16)
}

pub fn round_i16(value: f64, field: &'static str) -> Result<i16> {
    let r = value.round_ties_even();
    if !(i16::MIN as f64..=i16::MAX as f64).contains(&r) {
        return Err(Error::value_range(field, value));
    }
    Ok(r as i16)
}

pub fn round_u32(value: f64, field: &'static str) -> Result<u32> {
    let r = value.round_ties_even();
    if !(0.0..=u32::MAX as f64).contains(&r) {
        return Err(Error::value_range(field, value));
    }
    Ok(r as u32)
}

/// Checked narrowing for integer inputs.
pub fn narrow<T, U>(value: T, field: &'static str) -> Result<U>
where
    T: Copy + ToString,
    U: TryFrom<T>,
{
    U::try_from(value).map_err(|_| Error::value_range(field, value))
}
