use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use terraform_cloud_connector::TerraformCloudConfig;

/// Environment variables read on top of the file, without their `TFC_` prefix.
const ENV_KEYS: [&str; 4] = ["token", "address", "request_timeout_secs", "max_retries"];

fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Yaml::file_exact(path));
    }
    figment.merge(Env::prefixed("TFC_").only(&ENV_KEYS))
}

/// Layer the optional YAML file and `TFC_*` variables into a connector config.
pub fn load(path: Option<&Path>) -> Result<TerraformCloudConfig> {
    figment(path)
        .extract()
        .context("failed to load configuration")
}
