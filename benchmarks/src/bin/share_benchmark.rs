use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use benchmarks::{details_path, summary_path, Args};
use sharenet::{report, BenchOptions, Config};

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run_benchmark(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("share_benchmark: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_benchmark(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&args.config)?;
    info!(
        "party {} of {}, payload sizes {:?} KB, {} mode",
        args.party_id, config.num_parties, config.payload_sizes_kb, args.network_mode,
    );

    let options = BenchOptions {
        iterations: args.iterations,
        base_port: args.base_port,
    };
    let result = sharenet::run_with(args.party_id, &config, &args.network_mode, &options)?;

    let summary = summary_path(
        &args.output_dir,
        result.num_parties,
        result.party_id,
        &result.network_mode,
    );
    write_report(&summary, |out| report::write_summary(out, &result))?;
    let details = details_path(
        &args.output_dir,
        result.num_parties,
        result.party_id,
        &result.network_mode,
    );
    write_report(&details, |out| report::write_details(out, &result))?;

    println!("=== Share exchange benchmark ===");
    println!(
        "party {} of {}, {} mode, {} iterations per payload size",
        result.party_id, result.num_parties, result.network_mode, args.iterations,
    );
    println!(
        "connection setup: {:.3} ms",
        result.setup_time.as_secs_f64() * 1e3,
    );
    for (index, phase) in result.phases.iter().enumerate() {
        println!(
            "round {}: {} KB ({} bytes) mean {:.3} ms",
            index + 1,
            phase.payload_size / 1024,
            phase.payload_size,
            phase.mean_ms,
        );
    }
    println!("summary written to {}", summary.display());
    println!("details written to {}", details.display());
    Ok(())
}

fn write_report(
    path: &Path,
    render: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|err| format!("cannot create {}: {err}", path.display()))?;
    let mut out = BufWriter::new(file);
    render(&mut out).map_err(|err| format!("cannot write {}: {err}", path.display()))?;
    out.flush()
        .map_err(|err| format!("cannot write {}: {err}", path.display()))?;
    Ok(())
}
