use crate::error::Result;
use crate::model::GatewayConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Prefix for environment overrides, e.g. `SESSIONGATE__EXPIRES_IN_SECS=3600`
pub const ENV_PREFIX: &str = "SESSIONGATE";

/// Load configuration from an optional YAML file overlaid with the environment
///
/// A missing file is not an error, so a deployment may be configured from
/// the environment alone.
///
/// # Errors
///
/// Fails when a source cannot be parsed or the result does not validate.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(false));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    finish(settings)
}

/// Load configuration from a YAML document only
///
/// # Errors
///
/// Fails when the document cannot be parsed or does not validate.
pub fn from_yaml(yaml: &str) -> Result<GatewayConfig> {
    let settings = Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .build()?;

    finish(settings)
}

fn finish(settings: Config) -> Result<GatewayConfig> {
    let config: GatewayConfig = settings.try_deserialize()?;
    crate::validation::validate(&config)?;

    tracing::debug!(
        role_flags = config.role_flags.len(),
        expires_in_secs = config.expires_in_secs,
        trusted_service_principal = %config.trusted_service_principal,
        "Gateway configuration loaded"
    );

    Ok(config)
}
