// Worker adapter as a CLI: configuration in, one JSON event per line out.
//
//   ferrite-mlp <config.json> <data.csv> [--snapshot out.json]
//
// Logs go to stderr (RUST_LOG, default `info`); stdout carries only events.
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use ferrite_mlp::{train, Dataset, TrainingConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, data_path, snapshot_path) = match args.as_slice() {
        [config, data] => (config, data, None),
        [config, data, flag, out] if flag == "--snapshot" => (config, data, Some(out)),
        _ => {
            eprintln!("usage: ferrite-mlp <config.json> <data.csv> [--snapshot out.json]");
            return ExitCode::from(2);
        }
    };

    match run(config_path, data_path, snapshot_path.map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str, data_path: &str, snapshot_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config: TrainingConfig = serde_json::from_str(&std::fs::read_to_string(config_path)?)?;
    let dataset = Dataset::parse_csv(&std::fs::read_to_string(data_path)?)?;

    let mut training = train(&config, &dataset)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for event in training.by_ref() {
        serde_json::to_writer(&mut out, &event?)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(outcome = ?training.outcome(), "run finished");
    if let Some(path) = snapshot_path {
        training.network().extract_network_params().save_json(path)?;
        info!(path, "snapshot saved");
    }
    Ok(())
}
