//! Thin CLI front end over the library: enumerate a file's sessions and
//! print a human-readable summary of each decode. The summary format is
//! informational only, not a committed output contract.
use std::process::ExitCode;

use blackbox_log::core::FrameKind;
use blackbox_log::session::LogFile;
use blackbox_log::sink::NullSink;
use blackbox_log::util::{estimate_num_cells, vbat_to_millivolts};
use clap::Parser;

#[derive(Parser)]
#[command(name = "blackbox-decode", about = "Summarize a blackbox telemetry log")]
struct Args {
    /// Path to the log file to decode.
    path: std::path::PathBuf,

    /// Decode only this session index instead of every session in the file.
    #[arg(long)]
    session: Option<usize>,

    /// Disable prediction; report raw residuals instead of reconstructed values.
    #[arg(long)]
    raw: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let file = match LogFile::open(&args.path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("failed to open {}: {err}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let indices: Vec<usize> = match args.session {
        Some(index) => vec![index],
        None => (0..file.session_count()).collect(),
    };

    for index in indices {
        let session = match file.session(index) {
            Ok(session) => session,
            Err(err) => {
                eprintln!("session {index}: {err}");
                return ExitCode::FAILURE;
            }
        };

        let mut sink = NullSink;
        let (header, stats) = match session.parse(args.raw, &mut sink) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("session {index}: decode aborted: {err}");
                return ExitCode::FAILURE;
            }
        };

        println!("session {index}: {} bytes", session.len());
        println!("  fields: {}", header.main.field_count());
        println!(
            "  battery: {} mV estimated across {} cells",
            vbat_to_millivolts(header.calibration.vbat_ref, &header.calibration),
            estimate_num_cells(&header.calibration)
        );
        for kind in [
            FrameKind::Intra,
            FrameKind::Inter,
            FrameKind::Gps,
            FrameKind::GpsHome,
            FrameKind::Event,
        ] {
            let kind_stats = stats.for_kind(kind);
            println!(
                "  {:?}: {} valid, {} corrupt, {} desync",
                kind, kind_stats.valid, kind_stats.corrupt, kind_stats.desync
            );
        }
        println!("  total corrupt frames: {}", stats.total_corrupt_frames);
        println!(
            "  intentionally absent iterations: {}",
            stats.intentionally_absent_iterations
        );
    }

    ExitCode::SUCCESS
}
