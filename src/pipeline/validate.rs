// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::{Config, Seed};
use crate::utils::report;

/// Validate configuration and seed data.
pub fn run_validate(config: &Config, base: &Path) -> Result<Seed> {
    report::header("Validating configuration");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("✓ Config OK");
    log::info!("    Channel: {}", config.feed.channel);
    log::info!("    Timezone: {}", config.feed.timezone);
    log::info!("    Keywords: {}", config.classifier.keywords.len());
    log::info!("    Ignore phrases: {}", config.classifier.ignore.len());

    let seed_path = config.storage.seed_path(base);
    let seed = Seed::load_or_bundled(seed_path.as_deref()).and_then(|seed| {
        seed.validate()?;
        Ok(seed)
    });
    let seed = match seed {
        Ok(seed) => seed,
        Err(e) => {
            log::error!("Seed validation failed: {}", e);
            return Err(e);
        }
    };

    log::info!("✓ Seed OK");
    log::info!("    Regions: {}", seed.regions.len());
    log::info!("    Districts: {}", seed.district_count());
    log::info!("    Communities: {}", seed.community_count());

    Ok(seed)
}
