use std::env;
use std::fs::File;
use std::io::Read;

use derive_more::Display;
use log::{debug, trace, warn};
use serde::Deserialize;

use crate::core::config::{self, ConfigError};

const DEFAULT_API_URL: fn() -> String = || "https://api.github.com".to_string();
const DEFAULT_USAGE_PATH: fn() -> String = || "/copilot/metrics".to_string();
const DEFAULT_API_VERSION: fn() -> String = || "2022-11-28".to_string();
const DEFAULT_CACHE_TTL_HOURS: fn() -> i64 = || 12;

const DEFAULT_CONFIG_FILENAME: &str = "application";
const CONFIG_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

const ENV_API_TOKEN: &str = "GITHUB_API_KEY";
const ENV_ORGANIZATION: &str = "GITHUB_ORG_NAME";
const ENV_API_VERSION: &str = "GITHUB_API_VERSION";

/// In-between wrapper for serde to map the root config key
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct PropertiesWrapper {
    #[serde(default)]
    pub copilot: ApplicationProperties,
}

/// The static application properties of Copilot FX.
///
/// These don't change during the lifecycle of the application.
#[derive(Debug, Display, Clone, Deserialize, PartialEq)]
#[display(fmt = "github: {:?}", github)]
pub struct ApplicationProperties {
    #[serde(default)]
    github: GithubProperties,
    #[serde(default)]
    sync: SyncProperties,
}

impl ApplicationProperties {
    /// Create a new [ApplicationProperties] which will look for the default config file
    /// within the working directory. It will parse the config file if found, else uses the
    /// defaults instead. Environment variables always take precedence over the config file.
    pub fn new_auto() -> Self {
        let mut properties = Self::from_filename(DEFAULT_CONFIG_FILENAME);
        properties.apply_environment();
        properties
    }

    pub fn from_filename(filename: &str) -> Self {
        debug!("Searching for config file with name \"{}\"", filename);
        let config_value = Self::find_existing_file(filename)
            .map(|mut e| {
                let mut data = String::new();
                if let Err(err) = e.read_to_string(&mut data) {
                    warn!("Unable to read the config file, {}", err);
                }
                data
            })
            .unwrap_or_default();

        Self::from_str(config_value.as_str())
    }

    pub fn from_str(config_data_value: &str) -> Self {
        trace!("Parsing config data {}", config_data_value);
        let data: PropertiesWrapper = match serde_yaml::from_str(config_data_value) {
            Ok(properties) => properties,
            Err(err) => {
                warn!("Failed to parse config, {}, using defaults instead", err);
                PropertiesWrapper {
                    copilot: ApplicationProperties::default(),
                }
            }
        };

        debug!("Parsed config data {:?}", &data);
        data.copilot
    }

    /// The GitHub API properties.
    pub fn github(&self) -> &GithubProperties {
        &self.github
    }

    /// The sync behavior properties.
    pub fn sync(&self) -> &SyncProperties {
        &self.sync
    }

    fn apply_environment(&mut self) {
        if let Ok(token) = env::var(ENV_API_TOKEN) {
            trace!("Applying environment override for the api token");
            self.github.api_token = token;
        }
        if let Ok(organization) = env::var(ENV_ORGANIZATION) {
            trace!("Applying environment override for the organization");
            self.github.organization = organization;
        }
        if let Ok(version) = env::var(ENV_API_VERSION) {
            trace!("Applying environment override for the api version");
            self.github.api_version = version;
        }
    }

    fn find_existing_file(filename: &str) -> Option<File> {
        for extension in CONFIG_EXTENSIONS {
            let path = Self::config_file_path(filename, extension);
            match File::open(&path) {
                Ok(file) => {
                    debug!("Found config file {}", &path);
                    return Some(file);
                }
                Err(_) => trace!("Config file location {} doesn't exist", &path),
            }
        }

        None
    }

    fn config_file_path(filename: &str, extension: &str) -> String {
        let mut directory = env::current_dir().unwrap_or_default();
        directory.push(format!("{}.{}", filename, extension));

        directory.to_str().unwrap_or_default().to_string()
    }
}

impl Default for ApplicationProperties {
    fn default() -> Self {
        Self {
            github: GithubProperties::default(),
            sync: SyncProperties::default(),
        }
    }
}

/// The static properties for the GitHub usage metrics endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GithubProperties {
    #[serde(alias = "api-url")]
    #[serde(default = "DEFAULT_API_URL")]
    api_url: String,
    #[serde(alias = "usage-path")]
    #[serde(default = "DEFAULT_USAGE_PATH")]
    usage_path: String,
    #[serde(default)]
    organization: String,
    #[serde(alias = "api-token")]
    #[serde(default)]
    api_token: String,
    #[serde(alias = "api-version")]
    #[serde(default = "DEFAULT_API_VERSION")]
    api_version: String,
}

impl GithubProperties {
    /// The base url of the GitHub API.
    pub fn api_url(&self) -> &str {
        self.api_url.as_str()
    }

    /// The usage metrics path relative to the organization resource.
    pub fn usage_path(&self) -> &str {
        self.usage_path.as_str()
    }

    /// The organization for which usage metrics are retrieved.
    pub fn organization(&self) -> &str {
        self.organization.as_str()
    }

    /// The bearer token used to authorize API requests.
    pub fn api_token(&self) -> &str {
        self.api_token.as_str()
    }

    /// The GitHub API version sent with each request.
    pub fn api_version(&self) -> &str {
        self.api_version.as_str()
    }

    /// Validate that all required properties have been provided.
    ///
    /// # Returns
    ///
    /// An empty result, or a [ConfigError::MissingProperty] for the first missing property.
    pub fn validate(&self) -> config::Result<()> {
        if self.api_token.is_empty() {
            return Err(ConfigError::MissingProperty(ENV_API_TOKEN.to_string()));
        }
        if self.organization.is_empty() {
            return Err(ConfigError::MissingProperty(ENV_ORGANIZATION.to_string()));
        }

        Ok(())
    }
}

impl Default for GithubProperties {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL(),
            usage_path: DEFAULT_USAGE_PATH(),
            organization: String::new(),
            api_token: String::new(),
            api_version: DEFAULT_API_VERSION(),
        }
    }
}

/// The static properties for the sync behavior.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncProperties {
    #[serde(alias = "cache-ttl-hours")]
    #[serde(default = "DEFAULT_CACHE_TTL_HOURS")]
    cache_ttl_hours: i64,
}

impl SyncProperties {
    /// The number of hours a completed fetch stays fresh before a new remote call is made.
    pub fn cache_ttl_hours(&self) -> i64 {
        self.cache_ttl_hours
    }
}

impl Default for SyncProperties {
    fn default() -> Self {
        Self {
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::init_logger;

    use super::*;

    #[test]
    fn test_from_str_defaults() {
        init_logger!();

        let result = ApplicationProperties::from_str("");

        assert_eq!("https://api.github.com", result.github().api_url());
        assert_eq!("/copilot/metrics", result.github().usage_path());
        assert_eq!("2022-11-28", result.github().api_version());
        assert_eq!(12, result.sync().cache_ttl_hours())
    }

    #[test]
    fn test_from_str() {
        init_logger!();
        let config = r#"
copilot:
  github:
    organization: lorem
    api-token: ipsum
    api-version: "2023-01-01"
  sync:
    cache-ttl-hours: 4
"#;

        let result = ApplicationProperties::from_str(config);

        assert_eq!("lorem", result.github().organization());
        assert_eq!("ipsum", result.github().api_token());
        assert_eq!("2023-01-01", result.github().api_version());
        assert_eq!(4, result.sync().cache_ttl_hours())
    }

    #[test]
    fn test_from_str_invalid_config() {
        init_logger!();

        let result = ApplicationProperties::from_str("lorem: [ipsum");

        assert_eq!(ApplicationProperties::default(), result)
    }

    #[test]
    fn test_validate() {
        init_logger!();
        let config = r#"
copilot:
  github:
    organization: lorem
    api-token: ipsum
"#;

        let result = ApplicationProperties::from_str(config);

        assert_eq!(Ok(()), result.github().validate())
    }

    #[test]
    fn test_validate_missing_token() {
        init_logger!();

        let result = ApplicationProperties::from_str("");

        assert_eq!(
            Err(ConfigError::MissingProperty(ENV_API_TOKEN.to_string())),
            result.github().validate()
        )
    }

    #[test]
    fn test_new_auto_environment_overrides() {
        init_logger!();
        env::set_var(ENV_API_TOKEN, "MyEnvToken");
        env::set_var(ENV_ORGANIZATION, "MyEnvOrg");
        env::set_var(ENV_API_VERSION, "2024-05-01");

        let result = ApplicationProperties::new_auto();

        env::remove_var(ENV_API_TOKEN);
        env::remove_var(ENV_ORGANIZATION);
        env::remove_var(ENV_API_VERSION);
        assert_eq!("MyEnvToken", result.github().api_token());
        assert_eq!("MyEnvOrg", result.github().organization());
        assert_eq!("2024-05-01", result.github().api_version())
    }
}
