pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "offer-resolver")]
#[command(about = "Find bookable flight offers between two places, falling back to nearby dates")]
pub struct CliConfig {
    #[arg(long, help = "Origin city or airport name, e.g. Paris")]
    pub origin: String,

    #[arg(long, help = "Destination city or airport name, e.g. Athens")]
    pub destination: String,

    #[arg(long, help = "Desired departure date (YYYY-MM-DD)")]
    pub date: String,

    #[arg(long, default_value = "1")]
    pub adults: u32,

    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Overrides [cache] dir")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, help = "Seed a journey into this directory after resolving")]
    pub journey_output: Option<PathBuf>,

    #[arg(long, default_value = "1")]
    pub user_id: i64,

    #[arg(long, default_value = "1000.0")]
    pub budget: f64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// File settings (or defaults) with the environment and CLI overrides applied.
    pub fn app_config(&self) -> Result<AppConfig> {
        let config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        let mut config = config.with_env()?;
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = dir.clone();
        }
        Ok(config)
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("origin", &self.origin)?;
        validation::validate_non_empty_string("destination", &self.destination)?;
        validation::validate_date("date", &self.date)?;
        validation::validate_range("adults", self.adults, 1, 9)?;
        if let Some(dir) = &self.journey_output {
            validation::validate_path("journey_output", &dir.to_string_lossy())?;
        }
        Ok(())
    }
}
