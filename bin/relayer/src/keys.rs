//! Loads the relayer key.

use std::{fs, path::Path};

use anyhow::Context;
use bridge_relayer_p2p_service::RelayerKeypair;

/// Reads the hex encoded secret key at `path`, resolved against `working_dir` when relative.
pub(crate) fn load_keypair(working_dir: &Path, path: &Path) -> anyhow::Result<RelayerKeypair> {
    let path = working_dir.join(path);
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("read key file {}", path.display()))?;

    let secret = hex::decode(contents.trim().trim_start_matches("0x"))
        .with_context(|| format!("decode key file {}", path.display()))?;

    RelayerKeypair::from_secret_bytes(&secret)
        .with_context(|| format!("invalid secret key in {}", path.display()))
}
