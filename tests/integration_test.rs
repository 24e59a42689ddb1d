use aucio::{auc, mw, mwrs, tmst};
use aucio::{AucDataset, Error, ExperimentType, MwDataset, MwrsHeader, ScanRecord};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use tempfile::NamedTempFile;

fn scan(readings: Vec<f64>) -> ScanRecord {
    ScanRecord {
        temperature:  20.0,
        speed:        50000.0,
        seconds:      600,
        omega2t:      1.0e8,
        wavelength:   230.0,
        radius_step:  0.001,
        readings,
        std_devs:     None,
        interpolated: Vec::new(),
    }
}

fn auc_dataset() -> AucDataset {
    AucDataset {
        version:         5,
        experiment_type: ExperimentType::Ip,
        cell:            4,
        channel:         'B',
        description:     "integration".to_string(),
        min_radius:      6.0,
        delta_radius:    0.001,
        primary_min:     0.0,
        primary_max:     0.0,
        secondary_min:   0.0,
        secondary_max:   0.0,
        scans:           vec![
            scan(vec![0.0, 0.2, 0.4, 0.6, 1.0]),
            scan(vec![1.0, 0.8, 0.5, 0.3, 0.0]),
        ],
    }
}

#[test]
fn test_auc_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    let ds = auc_dataset();
    let written = auc::encode(&path, &ds).unwrap();
    assert_eq!(written, std::fs::metadata(&path).unwrap().len());

    let back = auc::decode(&path).unwrap();
    assert_eq!(back.scans.len(), 2);
    assert_eq!(back.value_count(), 5);
    assert_eq!(back.cell, 4);
    assert_eq!(back.channel, 'B');
    for (orig, dec) in ds.scans.iter().zip(&back.scans) {
        assert_eq!(dec.readings.len(), 5);
        for (x, y) in orig.readings.iter().zip(&dec.readings) {
            assert!((x - y).abs() < 1.6e-5);
        }
    }
    let radius = back.radius();
    for (j, r) in radius.iter().enumerate() {
        assert_eq!(*r, back.min_radius + j as f64 * back.delta_radius);
    }
}

#[test]
fn test_auc_wrong_magic_from_disk() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let mut bytes = auc_dataset().to_bytes().unwrap();
    bytes[0] = b'X';
    temp_file.write_all(&bytes).unwrap();

    let err = auc::decode(temp_file.path()).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = auc::decode(dir.path().join("absent.auc")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_mwrs_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let header = MwrsHeader {
        cell:         1,
        channel:      'A',
        scan:         12,
        set_speed:    45000,
        speed:        44990,
        temperature:  19.9,
        omega2t:      1.0e7,
        seconds:      900,
        radius_count: 4,
        radius_start: 6.05,
        radius_step:  0.002,
        wavelengths:  vec![2500, 2800],
    };
    let intensities = vec![vec![0.0, 0.1, 0.2, 0.3], vec![1.0, 1.5, 2.0, 2.5]];

    mwrs::encode(temp_file.path(), &header, &intensities).unwrap();
    let rec = mwrs::decode(temp_file.path()).unwrap();

    assert_eq!(rec.header, header);
    assert_eq!(rec.intensities, vec![vec![0, 1000, 2000, 3000], vec![10000, 15000, 20000, 25000]]);
    assert!((rec.header.radius_at(3) - 6.056).abs() < 1e-12);
}

#[test]
fn test_failed_encode_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("A001.MW1");
    let ds = MwDataset {
        magic:        1234,
        timestamp:    0,
        version:      1,
        cell:         1,
        channel:      'A',
        scan:         1,
        sample:       String::new(),
        speed:        3000.0,
        temperature:  20.0,
        w2t:          0.0,
        seconds:      0.0,
        radius_count: 2,
        radius_start: 60.0,
        radius_end:   70.0,
        wavelengths:  vec![280.0, 260.0],
        intensities:  vec![vec![1, 2]],
    };

    assert!(matches!(mw::encode(&path, &ds), Err(Error::SizeMismatch { .. })));
    assert!(!path.exists());
}

#[test]
fn test_tmst_trailing_bytes_from_disk() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let mut bytes = b"TMST".to_vec();
    bytes.extend_from_slice(&[1, 0]);
    for i in 0..2u32 {
        bytes.write_u32::<BigEndian>(i * 10).unwrap();
        bytes.write_f32::<BigEndian>(1000.0).unwrap();
        bytes.write_u32::<BigEndian>(1000).unwrap();
        bytes.write_f32::<BigEndian>(0.0).unwrap();
        bytes.write_f32::<BigEndian>(20.0).unwrap();
        bytes.write_u16::<BigEndian>(1).unwrap();
        bytes.write_u16::<BigEndian>(i as u16).unwrap();
    }
    bytes.extend_from_slice(&[9; 7]);
    temp_file.write_all(&bytes).unwrap();

    let ds = tmst::decode(temp_file.path()).unwrap();
    assert_eq!(ds.records.len(), 2);
    assert_eq!(ds.records[1].time, 10);
    assert_eq!(ds.records[1].scan, 1);
}

#[test]
fn test_convert_auc_files_to_mw() {
    let dir = tempfile::tempdir().unwrap();
    let mut datasets = Vec::new();
    for wl in [230.0, 280.0] {
        let mut ds = auc_dataset();
        for s in &mut ds.scans {
            s.wavelength = wl;
        }
        let path = dir.path().join(format!("run.RI.4.B.{wl}.auc"));
        auc::encode(&path, &ds).unwrap();
        datasets.push(auc::decode(&path).unwrap());
    }

    let opts = aucio::ConvertOptions { timestamp: Some(1), ..Default::default() };
    let scans = aucio::auc_to_mw(&datasets, &opts).unwrap();
    assert_eq!(scans.len(), 2);

    let path = dir.path().join(aucio::convert::mw_file_name('B', scans[0].scan, 4));
    let written = mw::encode(&path, &scans[0]).unwrap();
    assert_eq!(path.file_name().unwrap(), "B001.MW4");
    assert_eq!(written, (mw::HEADER_SIZE + 2 * 2 + 4 * 2 * 5) as u64);
}
