use clap::{Parser, Subcommand};
use aucio::convert::{auc_to_mw, mw_file_name, ConvertOptions};
use aucio::{auc, mwrs, tmst, AucDataset};
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "aucio", about = "Inspect and convert analytical-ultracentrifuge scan files")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a .auc, .mwrs or .tmst file and print a summary
    Info {
        input: PathBuf,
        /// Dump the whole decoded dataset as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge single-wavelength AUC files into one MW file per scan
    Convert {
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// JSON file with MW header options
        #[arg(long)]
        options: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Info { input, json } => info_cmd(&input, json)?,
        Commands::Convert { input, output_dir, options } => {
            let opts = match options {
                Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
                None       => ConvertOptions::default(),
            };
            convert_cmd(&input, &output_dir, &opts)?;
        }
    }

    Ok(())
}

// ── Info ─────────────────────────────────────────────────────────────────────

fn info_cmd(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "auc" => {
            let ds = auc::decode(input)?;
            if json { return print_json(&ds); }
            println!("── AUC ──────────────────────────────────────────────────");
            println!("  Path         {}", input.display());
            println!("  Version      {}", ds.version);
            println!("  Type         {:?}", ds.experiment_type);
            println!("  Cell/channel {}{}", ds.cell, ds.channel);
            println!("  Description  {}", ds.description);
            println!("  Radius       {} + j * {}", ds.min_radius, ds.delta_radius);
            println!("  Range        [{}, {}]", ds.primary_min, ds.primary_max);
            println!("  Std devs     {}", ds.has_secondary());
            println!("  Scans        {} x {} readings", ds.scans.len(), ds.value_count());
            for (i, s) in ds.scans.iter().enumerate() {
                println!("    {:>4}  t={:>7}s  {:>8.0} rpm  {:>6.1} °C  {:>6.1} nm",
                         i + 1, s.seconds, s.speed, s.temperature, s.wavelength);
            }
        }
        "mwrs" => {
            let rec = mwrs::decode(input)?;
            if json { return print_json(&rec); }
            let h = &rec.header;
            println!("── MWRS ─────────────────────────────────────────────────");
            println!("  Path         {}", input.display());
            println!("  Cell/channel {}{}", h.cell, h.channel);
            println!("  Scan         {}", h.scan);
            println!("  Speed        {} (set {})", h.speed, h.set_speed);
            println!("  Temperature  {} °C", h.temperature);
            println!("  Seconds      {}", h.seconds);
            println!("  Radius       {} + j * {} ({} points)", h.radius_start, h.radius_step, h.radius_count);
            println!("  Wavelengths  {:?}", h.wavelengths);
        }
        "tmst" => {
            let ds = tmst::decode(input)?;
            if json { return print_json(&ds); }
            println!("── TMST ─────────────────────────────────────────────────");
            println!("  Path         {}", input.display());
            println!("  Magic        {}", ds.magic);
            println!("  Version      {}.{}", ds.major_version, ds.minor_version);
            println!("  Records      {}", ds.records.len());
            if let (Some(first), Some(last)) = (ds.records.first(), ds.records.last()) {
                println!("  Time span    {}s .. {}s", first.time, last.time);
            }
        }
        other => return Err(format!("Unknown file type '{other}' (expected auc, mwrs or tmst)").into()),
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Convert ──────────────────────────────────────────────────────────────────

fn convert_cmd(inputs: &[PathBuf], output_dir: &Path, opts: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut groups: BTreeMap<(u8, char), Vec<AucDataset>> = BTreeMap::new();
    for path in inputs {
        let ds = auc::decode(path)?;
        info!("read {} ({} scans)", path.display(), ds.scans.len());
        groups.entry((ds.cell, ds.channel)).or_default().push(ds);
    }

    std::fs::create_dir_all(output_dir)?;
    for ((cell, channel), datasets) in groups {
        for mw in auc_to_mw(&datasets, opts)? {
            let path = output_dir.join(mw_file_name(channel, mw.scan, cell));
            let written = aucio::mw::encode(&path, &mw)?;
            println!("  wrote  {} ({} B)", path.display(), written);
        }
    }
    Ok(())
}
