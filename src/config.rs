use clap::Parser;
use rand::Rng;
use serde::Deserialize;
use std::path::PathBuf;

/// bcrypt accepts costs in `4..=31`.
pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// One year.
pub const MAX_TOKEN_HOURS: u64 = 24 * 365;

#[derive(Parser, Debug)]
#[command(name = "overcastly", about = "Backend for a location-based social posting app")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign login tokens
    #[arg(long, env = "OVERCASTLY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Nothing survives a restart
    Memory,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Empty means "generate one at startup"
    pub jwt_secret: String,
    pub token_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref secret) = cli.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }

        if config.auth.jwt_secret.is_empty() {
            tracing::warn!(
                "No JWT secret configured; generated a random one, tokens will not survive a restart"
            );
            config.auth.jwt_secret = generate_secret();
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("overcastly.db"));
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would only fail later, per request.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !BCRYPT_COST_RANGE.contains(&self.auth.bcrypt_cost) {
            anyhow::bail!(
                "auth.bcrypt_cost must be between {} and {}, got {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end(),
                self.auth.bcrypt_cost
            );
        }
        if self.auth.token_hours == 0 || self.auth.token_hours > MAX_TOKEN_HOURS {
            anyhow::bail!(
                "auth.token_hours must be between 1 and {}, got {}",
                MAX_TOKEN_HOURS,
                self.auth.token_hours
            );
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".overcastly"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }

    pub fn jwt_secret(&self) -> &str {
        &self.auth.jwt_secret
    }
}

/// Random 32-byte hex secret.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            jwt_secret: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.database.backend, StorageBackend::Sqlite);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-overcastly")));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-overcastly")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), Some(&tmp.path().join("overcastly.db")));
    }

    #[test]
    fn missing_secret_is_generated() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.jwt_secret().len(), 64);
    }

    #[test]
    fn load_reads_toml_file_and_cli_overrides_win() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[database]
backend = "memory"

[auth]
jwt_secret = "from-file"
token_hours = 1
bcrypt_cost = 4
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            jwt_secret: Some("from-cli".to_string()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.auth.token_hours, 1);
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert_eq!(config.jwt_secret(), "from-cli");
    }

    fn load_with_auth(auth_section: &str) -> anyhow::Result<Config> {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, format!("[auth]\n{}\n", auth_section)).unwrap();

        let mut cli = cli(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        Config::load(&cli)
    }

    #[test]
    fn bcrypt_cost_outside_supported_range_is_rejected() {
        assert!(load_with_auth("bcrypt_cost = 2").is_err());
        assert!(load_with_auth("bcrypt_cost = 32").is_err());
        assert_eq!(load_with_auth("bcrypt_cost = 4").unwrap().auth.bcrypt_cost, 4);
        assert_eq!(load_with_auth("bcrypt_cost = 31").unwrap().auth.bcrypt_cost, 31);
    }

    #[test]
    fn token_hours_must_be_positive_and_bounded() {
        assert!(load_with_auth("token_hours = 0").is_err());
        assert!(load_with_auth("token_hours = 10000000000").is_err());
        assert!(load_with_auth(&format!("token_hours = {}", MAX_TOKEN_HOURS + 1)).is_err());
        assert_eq!(
            load_with_auth(&format!("token_hours = {}", MAX_TOKEN_HOURS))
                .unwrap()
                .auth
                .token_hours,
            MAX_TOKEN_HOURS
        );
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }
}
