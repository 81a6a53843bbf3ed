//! Final status line of a run, for the humans reading the scheduler logs.

use cert_rotation::SyncError;
use cert_rotation::SyncOutcome;
use cert_rotation::SyncReport;
use yansi::Paint as _;

pub fn success(report: &SyncReport) {
    for warning in &report.prune_warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }

    match report.outcome {
        SyncOutcome::Updated => println!(
            "{} {} ({} backed up, {} expired backups removed)",
            "✓".green().bold(),
            report.outcome,
            report.backups.len(),
            report.pruned
        ),
        SyncOutcome::UpToDate | SyncOutcome::WouldUpdate => {
            println!("{} {}", "✓".green().bold(), report.outcome)
        }
    }
}

pub fn failure(err: SyncError) {
    let installed = err.is_installed_but_not_reloaded();
    eprintln!("{} {:#}", "error:".red().bold(), anyhow::Error::new(err));
    if installed {
        eprintln!(
            "{} the new certificate is installed but the service may still be using the old one",
            "warning:".yellow().bold()
        );
    }
}
