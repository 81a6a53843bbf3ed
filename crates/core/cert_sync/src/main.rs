#![forbid(unsafe_code)]
#![deny(clippy::mem_forget)]

use cert_rotation::CertSync;
use cert_rotation::Stage;
use cert_rotation::SyncConfig;
use cert_rotation::SyncError;
use cert_rotation::SyncReport;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod logging;
mod status;

fn main() -> ExitCode {
    let opt = cli::Opt::parse();
    logging::initialise_tracing_subscriber(opt.debug);

    match run(&opt) {
        Ok(report) => {
            status::success(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.exit_code();
            status::failure(err);
            ExitCode::from(code)
        }
    }
}

fn run(opt: &cli::Opt) -> Result<SyncReport, SyncError> {
    let config = SyncConfig::load(&opt.config).map_err(SyncError::at(Stage::Config))?;
    let sync = CertSync::try_new(config)
        .map_err(SyncError::at(Stage::Config))?
        .dry_run(opt.dry_run);
    sync.run()
}
