use anyhow::Result;
use std::sync::OnceLock;

use config::{Config, FileFormat};

pub fn get_config() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();

    CONFIG.get_or_init(|| build_config().unwrap())
}

fn build_config() -> Result<Config> {
    Ok(Config::builder()
        .set_default("sim.initial_grant", "fine")?
        .set_default("sim.grant_result", "fine")?
        .set_default("sim.rationale", false)?
        .set_default("sim.latitude", 37.4219983)?
        .set_default("sim.longitude", -122.084)?
        .set_default("sim.altitude", 12.0)?
        .set_default("sim.movement", true)?
        .set_default("sim.fix_delay", 0)?
        .set_default("sim.cached_fix", false)?
        .set_default("sim.last_known_fails", false)?
        .set_default("sim.revoked", false)?
        .add_source(config::Environment::with_prefix("GEOGLANCE").separator("__"))
        .add_source(config::File::new("geoglance.toml", FileFormat::Toml).required(false))
        .build()?)
}
