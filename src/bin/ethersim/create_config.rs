use std::path::Path;

use anyhow::Result;
use ethersim::{Config, NetworkConfig};

pub(super) fn create_config(output: &Path) -> Result<()> {
    NetworkConfig::default().save(output)
}
