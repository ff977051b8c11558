//! Test configuration builder for creating test configs programmatically

use fleet_manager::config::{Config, ConfigManager};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    region_configs: HashMap<String, RegionConfigBuilder>,
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            region_configs: HashMap::new(),
        }
    }

    /// Configure main settings
    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Add a region configuration
    pub fn with_region<F>(mut self, region: &str, f: F) -> Self
    where
        F: FnOnce(RegionConfigBuilder) -> RegionConfigBuilder,
    {
        let builder = f(RegionConfigBuilder::default());
        self.region_configs.insert(region.to_string(), builder);
        self
    }

    /// Build and write config files to temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        // Write main.toml
        let main_toml = self.main_config.to_toml();
        fs::write(config_dir.join("main.toml"), main_toml).expect("Failed to write main.toml");

        // Write region configs
        for (name, builder) in self.region_configs {
            fs::write(config_dir.join(format!("{}.toml", name)), builder.to_toml())
                .expect("Failed to write region config");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main configuration builder
#[derive(Clone)]
pub struct MainConfigBuilder {
    host: String,
    port: u16,
    check_interval_seconds: u64,
    max_remote_attempts: u32,
    remote_backoff_ms: u64,
    provisioning_parallelism: usize,
    thaw_teardown_on_failure: bool,
    schedules: Vec<(String, String, Option<String>)>,
}

impl MainConfigBuilder {
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn check_interval(mut self, seconds: u64) -> Self {
        self.check_interval_seconds = seconds;
        self
    }

    pub fn max_remote_attempts(mut self, attempts: u32) -> Self {
        self.max_remote_attempts = attempts;
        self
    }

    pub fn remote_backoff_ms(mut self, ms: u64) -> Self {
        self.remote_backoff_ms = ms;
        self
    }

    pub fn provisioning_parallelism(mut self, parallelism: usize) -> Self {
        self.provisioning_parallelism = parallelism;
        self
    }

    pub fn thaw_teardown_on_failure(mut self, enabled: bool) -> Self {
        self.thaw_teardown_on_failure = enabled;
        self
    }

    pub fn schedule(mut self, chain: &str, cron: &str, name_prefix: Option<&str>) -> Self {
        self.schedules.push((
            chain.to_string(),
            cron.to_string(),
            name_prefix.map(str::to_string),
        ));
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = format!(
            r#"
host = "{}"
port = {}
check_interval_seconds = {}
database_path = ":memory:"
provider = "sandbox"
max_remote_attempts = {}
remote_backoff_ms = {}
provisioning_parallelism = {}
thaw_teardown_on_failure = {}
"#,
            self.host,
            self.port,
            self.check_interval_seconds,
            self.max_remote_attempts,
            self.remote_backoff_ms,
            self.provisioning_parallelism,
            self.thaw_teardown_on_failure
        );

        for (chain, cron, prefix) in &self.schedules {
            toml.push_str(&format!(
                "\n[[schedules]]\nchain = \"{}\"\nschedule = \"{}\"\n",
                chain, cron
            ));
            if let Some(prefix) = prefix {
                toml.push_str(&format!("name_prefix = \"{}\"\n", prefix));
            }
        }

        toml
    }
}

impl Default for MainConfigBuilder {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8095,
            check_interval_seconds: 90,
            max_remote_attempts: 5,
            remote_backoff_ms: 5000,
            provisioning_parallelism: 1,
            thaw_teardown_on_failure: false,
            schedules: Vec::new(),
        }
    }
}

/// Region configuration builder
#[derive(Clone)]
pub struct RegionConfigBuilder {
    default_ami: Option<String>,
    instance_type: String,
    volume_size_gb: u32,
}

impl RegionConfigBuilder {
    pub fn default_ami(mut self, ami: &str) -> Self {
        self.default_ami = Some(ami.to_string());
        self
    }

    pub fn instance_type(mut self, instance_type: &str) -> Self {
        self.instance_type = instance_type.to_string();
        self
    }

    pub fn volume_size_gb(mut self, size: u32) -> Self {
        self.volume_size_gb = size;
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = String::from("[region]\n");
        if let Some(ami) = &self.default_ami {
            toml.push_str(&format!("default_ami = \"{}\"\n", ami));
        }
        toml.push_str(&format!(
            "instance_type = \"{}\"\nvolume_size_gb = {}\n",
            self.instance_type, self.volume_size_gb
        ));
        toml
    }
}

impl Default for RegionConfigBuilder {
    fn default() -> Self {
        Self {
            default_ami: None,
            instance_type: "t2.micro".to_string(),
            volume_size_gb: 10,
        }
    }
}

/// Built test configuration with temp directory
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestConfig {
    /// Get the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Load the written files the way the manager does at startup
    pub async fn load(&self) -> anyhow::Result<Arc<Config>> {
        let manager = ConfigManager::new(self.config_dir.to_string_lossy().to_string()).await?;
        Ok(manager.get_current_config())
    }
}
