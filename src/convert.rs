//! AUC → MW export.
//!
//! An AUC file holds one wavelength of one cell/channel.  The MW format holds
//! every wavelength of one scan, so the single-wavelength datasets of a
//! cell/channel are merged scan index by scan index.

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::auc::AucDataset;
use crate::error::Result;
use crate::field::narrow;
use crate::mw::MwDataset;

/// Values the MW header needs that AUC files do not carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub magic:           u32,
    /// 48-bit timestamp; the current time when unset.
    pub timestamp:       Option<u64>,
    pub version:         u16,
    /// Multiplier applied to AUC readings before truncation to counts.
    pub intensity_scale: f64,
    /// Multiplier from AUC radius units (cm) to MW radius units (mm).
    pub radius_scale:    f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            magic:           1234,
            timestamp:       None,
            version:         11060,
            intensity_scale: 1.0,
            radius_scale:    10.0,
        }
    }
}

impl ConvertOptions {
    fn resolved_timestamp(&self) -> u64 {
        self.timestamp
            .unwrap_or_else(|| Utc::now().timestamp().max(0) as u64)
    }
}

/// MW file name for a scan: channel, 3-digit scan number, `.MW` and cell.
pub fn mw_file_name(channel: char, scan: u16, cell: u8) -> String {
    format!("{channel}{scan:03}.MW{cell}")
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Merge the wavelength datasets of one cell/channel into one MW dataset per
/// scan index.
///
/// Radius bounds are averaged over the datasets; per-scan temperature, ω²t,
/// elapsed time, speed and reading count are averaged over the wavelengths
/// that have that scan.  Cell and channel come from the first dataset, the
/// sample name from the last.
pub fn auc_to_mw(datasets: &[AucDataset], opts: &ConvertOptions) -> Result<Vec<MwDataset>> {
    let (Some(first), Some(last)) = (datasets.first(), datasets.last()) else {
        return Ok(Vec::new());
    };
    if datasets.iter().any(|d| d.cell != first.cell || d.channel != first.channel) {
        warn!("merging AUC datasets from different cells/channels into cell {} channel {}",
              first.cell, first.channel);
    }

    let min_radius = mean(datasets.iter().map(|d| d.min_radius));
    let max_radius = mean(datasets.iter().map(|d| {
        d.value_count().checked_sub(1).map_or(d.min_radius, |j| d.radius_at(j))
    }));
    let timestamp = opts.resolved_timestamp();
    let scan_total = datasets.iter().map(|d| d.scans.len()).max().unwrap_or(0);

    let mut out = Vec::with_capacity(scan_total);
    for index in 0..scan_total {
        let scans: Vec<_> = datasets.iter().filter_map(|d| d.scans.get(index)).collect();

        let reading_count = mean(scans.iter().map(|s| s.readings.len() as f64));
        let intensities: Vec<Vec<i64>> = scans
            .iter()
            .map(|s| {
                s.readings
                    .iter()
                    .map(|v| (v * opts.intensity_scale).max(0.0) as i64)
                    .collect()
            })
            .collect();

        out.push(MwDataset {
            magic:        opts.magic,
            timestamp,
            version:      opts.version,
            cell:         first.cell,
            channel:      first.channel,
            scan:         narrow(index + 1, "scan")?,
            sample:       last.description.clone(),
            speed:        mean(scans.iter().map(|s| s.speed)).round_ties_even(),
            temperature:  mean(scans.iter().map(|s| s.temperature)),
            w2t:          mean(scans.iter().map(|s| s.omega2t)),
            seconds:      mean(scans.iter().map(|s| s.seconds as f64)).round_ties_even(),
            radius_count: narrow(reading_count as u64, "radius_count")?,
            radius_start: min_radius * opts.radius_scale,
            radius_end:   max_radius * opts.radius_scale,
            wavelengths:  scans.iter().map(|s| s.wavelength.trunc()).collect(),
            intensities,
        });
    }

    debug!(
        "merged {} AUC datasets of cell {} channel {} into {} MW scans",
        datasets.len(),
        first.cell,
        first.channel,
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auc::{ExperimentType, ScanRecord};

    fn scan(wavelength: f64, temperature: f64, readings: Vec<f64>) -> ScanRecord {
        ScanRecord {
            temperature,
            speed:        40000.0 + temperature,
            seconds:      100 * temperature as i32,
            omega2t:      2.0e6 * temperature,
            wavelength,
            radius_step:  0.5,
            readings,
            std_devs:     None,
            interpolated: Vec::new(),
        }
    }

    fn dataset(wavelength: f64, min_radius: f64, scans: Vec<ScanRecord>) -> AucDataset {
        AucDataset {
            version:         5,
            experiment_type: ExperimentType::Ra,
            cell:            1,
            channel:         'A',
            description:     format!("sample @ {wavelength}"),
            min_radius,
            delta_radius:    0.5,
            primary_min:     0.0,
            primary_max:     0.0,
            secondary_min:   0.0,
            secondary_max:   0.0,
            scans,
        }
    }

    fn options() -> ConvertOptions {
        ConvertOptions { timestamp: Some(1_711_494_000), ..ConvertOptions::default() }
    }

    #[test]
    fn merges_wavelengths_per_scan() {
        let a = dataset(260.0, 6.0, vec![
            scan(260.4, 20.0, vec![1.9, 2.2, -0.3]),
            scan(260.4, 22.0, vec![3.0, 3.0, 3.0]),
        ]);
        let b = dataset(280.0, 7.0, vec![
            scan(280.0, 24.0, vec![5.5, 0.0, 7.0]),
        ]);

        let mw = auc_to_mw(&[a, b], &options()).unwrap();
        assert_eq!(mw.len(), 2);

        let first = &mw[0];
        assert_eq!(first.scan, 1);
        assert_eq!(first.cell, 1);
        assert_eq!(first.channel, 'A');
        assert_eq!(first.sample, "sample @ 280");
        assert_eq!(first.timestamp, 1_711_494_000);
        assert_eq!(first.temperature, 22.0);
        assert_eq!(first.speed, 40022.0);
        assert_eq!(first.seconds, 2200.0);
        assert_eq!(first.w2t, 4.4e7);
        assert_eq!(first.radius_count, 3);
        // min radius 6.5 cm, last radius (6 + 1) and (7 + 1) averaged to 7.5 cm
        assert_eq!(first.radius_start, 65.0);
        assert_eq!(first.radius_end, 75.0);
        assert_eq!(first.wavelengths, vec![260.0, 280.0]);
        assert_eq!(first.intensities, vec![vec![1, 2, 0], vec![5, 0, 7]]);

        let second = &mw[1];
        assert_eq!(second.scan, 2);
        assert_eq!(second.wavelengths, vec![260.0]);
        assert_eq!(second.intensities, vec![vec![3, 3, 3]]);
        assert!(second.to_bytes().is_ok());
    }

    #[test]
    fn intensity_scale_applies_before_truncation() {
        let ds = dataset(260.0, 6.0, vec![scan(260.0, 20.0, vec![0.25, 1.5])]);
        let opts = ConvertOptions { intensity_scale: 1000.0, ..options() };
        let mw = auc_to_mw(&[ds], &opts).unwrap();
        assert_eq!(mw[0].intensities, vec![vec![250, 1500]]);
    }

    #[test]
    fn empty_input() {
        assert!(auc_to_mw(&[], &options()).unwrap().is_empty());
    }

    #[test]
    fn default_timestamp_is_now() {
        let opts = ConvertOptions::default();
        assert!(opts.resolved_timestamp() > 1_700_000_000);
    }

    #[test]
    fn options_from_partial_json() {
        let opts: ConvertOptions = serde_json::from_str(r#"{"magic": 42}"#).unwrap();
        assert_eq!(opts.magic, 42);
        assert_eq!(opts.version, 11060);
        assert_eq!(opts.timestamp, None);
    }

    #[test]
    fn file_names() {
        assert_eq!(mw_file_name('A', 7, 2), "A007.MW2");
        assert_eq!(mw_file_name('B', 123, 8), "B123.MW8");
    }
}
