// File: manager/src/config/manager.rs
use super::{Config, RegionConfigFile};
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        // One file per region, named after the region
        let pattern = format!("{}/*.toml", config_dir);
        let mut regions = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == "main.toml" {
                continue;
            }

            let region_name = filename
                .strip_suffix(".toml")
                .ok_or_else(|| anyhow!("Invalid config filename: {}", filename))?;

            debug!("Loading region config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let region_file: RegionConfigFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            let mut region_config = region_file.region;
            region_config.name = region_name.to_string();
            regions.insert(region_name.to_string(), region_config);
        }

        config.regions = regions;
        config.validate()?;

        info!(
            "Loaded {} regions, {} chainshot schedules, provider {:?}",
            config.regions.len(),
            config.schedules.len(),
            config.provider
        );

        Ok(config)
    }
}
