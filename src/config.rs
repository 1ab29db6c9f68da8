use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_BACKDROP_BASE_URL: &str = "https://image.tmdb.org/t/p/w1280";

// Public demo key shipped with the catalog's sample apps
const DEMO_API_KEY: &str = "8265bd1679663a7ea12ac168da84d2e8";

pub const DEFAULT_AVATAR: &str = "https://images.pexels.com/photos/1239291/pexels-photo-1239291.jpeg?auto=compress&cs=tinysrgb&w=100&h=100&dpr=1";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Connection settings for the movie catalog API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_backdrop_base_url")]
    pub backdrop_base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_catalog_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_image_base_url() -> String {
    DEFAULT_IMAGE_BASE_URL.to_string()
}
fn default_backdrop_base_url() -> String {
    DEFAULT_BACKDROP_BASE_URL.to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("TMDB_API_KEY".to_string())
}
fn default_catalog_timeout_ms() -> u64 {
    15_000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            backdrop_base_url: default_backdrop_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_catalog_timeout_ms(),
        }
    }
}

impl CatalogConfig {
    /// Resolve the API key from config, then environment, then the demo key
    pub fn resolve_api_key(&self) -> String {
        if let Some(key) = &self.api_key {
            return key.clone();
        }

        if let Some(env_var) = &self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                if !key.is_empty() {
                    return key;
                }
            }
        }

        DEMO_API_KEY.to_string()
    }
}

/// Behaviour of the local sign-in flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Artificial delay applied to login and signup
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
    #[serde(default = "default_avatar")]
    pub default_avatar: String,
}

fn default_simulated_delay_ms() -> u64 {
    1_000
}
fn default_avatar() -> String {
    DEFAULT_AVATAR.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            simulated_delay_ms: default_simulated_delay_ms(),
            default_avatar: default_avatar(),
        }
    }
}

/// Where session and favorites are persisted
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, or ~/.flix/state, or .flix/state without a home
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".flix").join("state"))
            .unwrap_or_else(|| Path::new(".flix").join("state"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_sample_videos")]
    pub sample_videos: Vec<String>,
    #[serde(default = "default_poster")]
    pub poster: String,
}

fn default_sample_videos() -> Vec<String> {
    vec![
        "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4"
            .to_string(),
        "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4"
            .to_string(),
        "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4"
            .to_string(),
    ]
}

fn default_poster() -> String {
    "https://images.pexels.com/photos/1239291/pexels-photo-1239291.jpeg?auto=compress&cs=tinysrgb&w=800&h=450&dpr=1".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_videos: default_sample_videos(),
            poster: default_poster(),
        }
    }
}

/// Page browsing behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseConfig {
    /// How long a page command blocks before leaving the load in the background
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

fn default_wait_ms() -> u64 {
    10_000
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            wait_ms: default_wait_ms(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.flix/config.local.toml) > project (.flix/config.toml) > user (~/.flix/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".flix").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_partial(&user_config)?);
            }
        }

        let project_config = Path::new(".flix").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_partial(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".flix").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_partial(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_partial(path: &Path) -> Result<PartialConfig> {
        let content = std::fs::read_to_string(path)?;
        let partial: PartialConfig = toml::from_str(&content)?;
        Ok(partial)
    }

    /// Merge a layer into this config; only keys present in the layer win
    fn merge(&mut self, other: PartialConfig) {
        if let Some(catalog) = other.catalog {
            let c = &mut self.catalog;
            if let Some(v) = catalog.base_url {
                c.base_url = v;
            }
            if let Some(v) = catalog.image_base_url {
                c.image_base_url = v;
            }
            if let Some(v) = catalog.backdrop_base_url {
                c.backdrop_base_url = v;
            }
            if catalog.api_key.is_some() {
                c.api_key = catalog.api_key;
            }
            if catalog.api_key_env.is_some() {
                c.api_key_env = catalog.api_key_env;
            }
            if let Some(v) = catalog.timeout_ms {
                c.timeout_ms = v;
            }
        }

        if let Some(session) = other.session {
            if let Some(v) = session.simulated_delay_ms {
                self.session.simulated_delay_ms = v;
            }
            if let Some(v) = session.default_avatar {
                self.session.default_avatar = v;
            }
        }

        if let Some(storage) = other.storage {
            if storage.dir.is_some() {
                self.storage.dir = storage.dir;
            }
        }

        if let Some(player) = other.player {
            if let Some(v) = player.sample_videos {
                self.player.sample_videos = v;
            }
            if let Some(v) = player.poster {
                self.player.poster = v;
            }
        }

        if let Some(browse) = other.browse {
            if let Some(v) = browse.wait_ms {
                self.browse.wait_ms = v;
            }
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let urls = [
            ("catalog.base_url", &self.catalog.base_url),
            ("catalog.image_base_url", &self.catalog.image_base_url),
            ("catalog.backdrop_base_url", &self.catalog.backdrop_base_url),
        ];
        for (field, url) in urls {
            if !is_http_url(url) {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Expected an http(s) URL, got '{}'", url),
                });
            }
        }

        if self.catalog.timeout_ms == 0 {
            errors.push(ValidationError {
                field: "catalog.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.player.sample_videos.is_empty() {
            errors.push(ValidationError {
                field: "player.sample_videos".to_string(),
                message: "At least one sample video is required".to_string(),
            });
        }
        for (i, url) in self.player.sample_videos.iter().enumerate() {
            if !is_http_url(url) {
                errors.push(ValidationError {
                    field: format!("player.sample_videos[{}]", i),
                    message: format!("Expected an http(s) URL, got '{}'", url),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// One config file layer; every field optional so layers only override what they set
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    catalog: Option<PartialCatalog>,
    session: Option<PartialSession>,
    storage: Option<StorageConfig>,
    player: Option<PartialPlayer>,
    browse: Option<PartialBrowse>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialCatalog {
    base_url: Option<String>,
    image_base_url: Option<String>,
    backdrop_base_url: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSession {
    simulated_delay_ms: Option<u64>,
    default_avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialPlayer {
    sample_videos: Option<Vec<String>>,
    poster: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialBrowse {
    wait_ms: Option<u64>,
}
