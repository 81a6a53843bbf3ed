use camino::Utf8PathBuf;
use cert_rotation::config::DEFAULT_CONFIG_PATH;

/// Install the current TLS certificate and key of an appliance, if they changed,
/// and reload the service using them.
///
/// Exit codes: 0 up to date or updated, 1 configuration, 2 lock, 3 fetch, 4 compare,
/// 5 backup, 6 install, 7 reload.
#[derive(clap::Parser, Debug)]
#[clap(
    name = clap::crate_name!(),
    version = clap::crate_version!(),
    about = clap::crate_description!()
)]
pub struct Opt {
    /// Path to the configuration file
    #[clap(long, short, env = "CERT_SYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: Utf8PathBuf,

    /// Only fetch and compare: tell if the installed material would be replaced
    #[clap(long)]
    pub dry_run: bool,

    /// Turn-on the debug log level.
    ///
    /// If off only reports ERROR, WARN, and INFO
    /// If on also reports DEBUG and TRACE
    #[clap(long, global = true)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::Parser;

    #[test]
    fn cli_is_well_formed() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parse_all_options() {
        let opt = Opt::try_parse_from([
            "cert-sync",
            "--config",
            "/tmp/cert-sync.toml",
            "--dry-run",
            "--debug",
        ])
        .unwrap();

        assert_eq!(opt.config, "/tmp/cert-sync.toml");
        assert!(opt.dry_run);
        assert!(opt.debug);
    }
}
