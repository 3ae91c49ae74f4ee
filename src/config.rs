use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Directory served read-only under `/storage`
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
    pub location: LocationConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub admins: Vec<AdminConfig>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:masjid_board.db?mode=rwc".to_string()
}

fn default_media_dir() -> String {
    "storage".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub name: String,
    /// City identifier understood by the myQuran API
    pub city_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Aladhan calculation method (20 = Kemenag RI)
    #[serde(default = "default_method")]
    pub method: u8,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_method() -> u8 {
    20
}

fn default_timezone() -> String {
    "Asia/Jakarta".to_string()
}

fn default_utc_offset_hours() -> i32 {
    7
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_myquran_base_url")]
    pub myquran_base_url: String,
    #[serde(default = "default_aladhan_base_url")]
    pub aladhan_base_url: String,
    /// Per-request timeout in seconds, kept within 10..=15
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            myquran_base_url: default_myquran_base_url(),
            aladhan_base_url: default_aladhan_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.clamp(10, 15))
    }
}

fn default_myquran_base_url() -> String {
    "https://api.myquran.com/v2".to_string()
}

fn default_aladhan_base_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub id: i64,
    pub name: String,
    pub token: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !(-12..=14).contains(&config.location.utc_offset_hours) {
            anyhow::bail!(
                "utc_offset_hours must be between -12 and 14, got {}",
                config.location.utc_offset_hours
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
        [location]
        name = "Kota Bogor"
        city_id = "1204"
        latitude = -6.5971
        longitude = 106.806
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_str(MINIMAL).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.database_url, "sqlite:masjid_board.db?mode=rwc");
        assert_eq!(config.media_dir, "storage");
        assert_eq!(config.location.method, 20);
        assert_eq!(config.location.timezone, "Asia/Jakarta");
        assert_eq!(config.location.utc_offset_hours, 7);
        assert_eq!(config.providers.myquran_base_url, "https://api.myquran.com/v2");
        assert_eq!(config.providers.aladhan_base_url, "https://api.aladhan.com/v1");
        assert_eq!(config.providers.timeout_secs, 10);
        assert!(config.admins.is_empty());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            bind_address = "127.0.0.1:8080"

            [location]
            name = "Kota Bandung"
            city_id = "1219"
            latitude = -6.9175
            longitude = 107.6191
            method = 11

            [providers]
            myquran_base_url = "http://localhost:9000"
            timeout_secs = 12

            [[admins]]
            id = 1
            name = "Admin Masjid"
            token = "secret-1"

            [[admins]]
            id = 2
            name = "Takmir Masjid"
            token = "secret-2"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.location.name, "Kota Bandung");
        assert_eq!(config.location.city_id, "1219");
        assert_eq!(config.location.method, 11);
        assert_eq!(config.providers.myquran_base_url, "http://localhost:9000");
        // Unset provider fields keep their defaults
        assert_eq!(config.providers.aladhan_base_url, "https://api.aladhan.com/v1");
        assert_eq!(config.providers.timeout_secs, 12);
        assert_eq!(config.admins.len(), 2);
        assert_eq!(config.admins[1].name, "Takmir Masjid");
    }

    #[test]
    fn test_timeout_is_clamped() {
        let mut providers = ProvidersConfig::default();
        assert_eq!(providers.timeout().as_secs(), 10);

        providers.timeout_secs = 1;
        assert_eq!(providers.timeout().as_secs(), 10);

        providers.timeout_secs = 60;
        assert_eq!(providers.timeout().as_secs(), 15);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/masjid.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let result = Config::from_str("this is not valid toml {{{");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_location_is_rejected() {
        let result = Config::from_str(r#"bind_address = "0.0.0.0:3000""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_location_missing_coordinates() {
        let content = r#"
            [location]
            name = "Kota Bogor"
            city_id = "1204"
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let content = format!("{MINIMAL}\nutc_offset_hours = 20\n");
        assert!(Config::from_str(&content).is_err());
    }
}
