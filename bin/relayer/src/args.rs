//! Parses command-line arguments for the relayer CLI.

use std::path::PathBuf;

use bridge_relayer_common::logging::OTLP_URL_ENVVAR;
use clap::{crate_version, Parser};

use crate::config::Config;

#[derive(Debug, Parser)]
#[clap(
    name = "bridge-relayer",
    about = "Relays token transfer batches between Chain-A and Chain-B",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the relayer",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(
        long,
        help = "The directory checkpoints, relative key files and saved logs live in",
        default_value = "."
    )]
    pub working_directory: PathBuf,

    #[clap(
        long,
        help = "The logger level, as `info,p2p=trace` or `*:INFO,p2p:TRACE`",
        default_value = "info"
    )]
    pub log_level: String,

    #[clap(long, help = "Also save the logs under <working-directory>/logs")]
    pub log_save: bool,

    #[clap(long, help = "Disable colors on the standard output")]
    pub disable_ansi_color: bool,

    #[clap(long, help = "Print the logger name on every line")]
    pub log_logger_name: bool,

    #[clap(
        long,
        env = OTLP_URL_ENVVAR,
        help = "The OpenTelemetry collector endpoint traces are exported to"
    )]
    pub otlp_url: Option<String>,

    #[clap(
        long,
        help = "The status RPC server address, `off` to disable it. Overrides `rpc.addr`"
    )]
    pub rest_api_interface: Option<String>,

    #[clap(long, help = "The Chain-B gateway url. Overrides `chain_b.network_address`")]
    pub network_address: Option<String>,

    #[clap(long, help = "The relayer key file. Overrides `relayer.private_key_file`")]
    pub private_key_file: Option<PathBuf>,

    #[clap(long, help = "Log how long every state machine step takes")]
    pub profile_mode: bool,
}

impl Cli {
    /// Applies the flags that override configuration values.
    pub(crate) fn apply_overrides(&self, config: &mut Config) {
        if let Some(addr) = &self.network_address {
            config.chain_b.network_address = addr.clone();
        }

        if let Some(path) = &self.private_key_file {
            config.relayer.private_key_file = path.clone();
        }

        if let Some(interface) = &self.rest_api_interface {
            config.rpc.addr = interface.clone();
        }

        if self.profile_mode {
            config.state_machine.a_to_b.profile_mode = true;
            config.state_machine.b_to_a.profile_mode = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otlp_url_is_optional() {
        let cli = Cli::try_parse_from([
            "bridge-relayer",
            "--otlp-url",
            "http://localhost:4317",
            "--profile-mode",
        ])
        .unwrap();

        assert_eq!(cli.otlp_url.as_deref(), Some("http://localhost:4317"));
        assert!(cli.profile_mode);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }
}
