use anyhow::{Context, Result, anyhow};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::combine::Combine;
use crate::dirs::{system_config_file, user_lupine_config_dir};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered `?` path patterns probed when resolving a module name
    pub src_patterns: Vec<String>,

    /// Module names intentionally left unresolved, to be satisfied by the
    /// runtime host's own loader
    pub ignored_modules: IndexSet<String>,

    /// Target Lua dialect; affects only how `require` syntax is recognized
    /// Supports: "lua51", "lua52", "lua53", "lua54", "luajit"
    /// Defaults to "luajit"
    #[serde(rename = "lua-version")]
    pub lua_version: String,

    /// Seal the bundle against the host `require`. When false (the default)
    /// unregistered module names fall back to the host loader at run time.
    pub isolate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_patterns: vec![
                "?.lua".to_string(),
                "?/init.lua".to_string(),
                "src/?.lua".to_string(),
                "src/?/init.lua".to_string(),
            ],
            ignored_modules: IndexSet::new(),
            lua_version: "luajit".to_string(),
            isolate: false,
        }
    }
}

impl Combine for Config {
    fn combine(self, other: Self) -> Self {
        Self {
            // For collections, higher precedence (self) completely replaces lower
            // precedence (other) if self has non-default values, otherwise use other
            src_patterns: if self.src_patterns != Config::default().src_patterns {
                self.src_patterns
            } else {
                other.src_patterns
            },
            ignored_modules: if !self.ignored_modules.is_empty() {
                self.ignored_modules
            } else {
                other.ignored_modules
            },
            // For scalars, self always takes precedence
            lua_version: self.lua_version,
            isolate: self.isolate,
        }
    }
}

/// Configuration values from environment variables with LUPINE_ prefix
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub src_patterns: Option<Vec<String>>,
    pub ignored_modules: Option<IndexSet<String>>,
    pub lua_version: Option<String>,
    pub isolate: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables with LUPINE_ prefix
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // LUPINE_SRC_PATTERNS - comma-separated list of `?` path patterns
        if let Ok(patterns_str) = env::var("LUPINE_SRC_PATTERNS") {
            let patterns: Vec<String> = patterns_str
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            if !patterns.is_empty() {
                config.src_patterns = Some(patterns);
            }
        }

        // LUPINE_IGNORED_MODULES - comma-separated list of module names
        if let Ok(ignored_str) = env::var("LUPINE_IGNORED_MODULES") {
            let modules: IndexSet<String> = ignored_str
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            if !modules.is_empty() {
                config.ignored_modules = Some(modules);
            }
        }

        // LUPINE_LUA_VERSION - target Lua dialect
        if let Ok(lua_version) = env::var("LUPINE_LUA_VERSION") {
            config.lua_version = Some(lua_version);
        }

        // LUPINE_ISOLATE - boolean flag
        if let Ok(isolate_str) = env::var("LUPINE_ISOLATE") {
            config.isolate = parse_bool(&isolate_str);
        }

        config
    }

    /// Apply environment config to base config
    pub fn apply_to(self, mut config: Config) -> Config {
        if let Some(src_patterns) = self.src_patterns {
            config.src_patterns = src_patterns;
        }
        if let Some(ignored_modules) = self.ignored_modules {
            config.ignored_modules = ignored_modules;
        }
        if let Some(lua_version) = self.lua_version {
            config.lua_version = lua_version;
        }
        if let Some(isolate) = self.isolate {
            config.isolate = isolate;
        }
        config
    }
}

/// Parse a boolean value from string, supporting various common formats
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Validate a Lua dialect string and return a human-readable description
    /// Supports: "lua51", "lua52", "lua53", "lua54", "luajit"
    pub fn parse_lua_version(version_str: &str) -> Result<&'static str> {
        match version_str {
            "lua51" => Ok("Lua 5.1"),
            "lua52" => Ok("Lua 5.2"),
            "lua53" => Ok("Lua 5.3"),
            "lua54" => Ok("Lua 5.4"),
            "luajit" => Ok("LuaJIT"),
            _ => Err(anyhow!(
                "Invalid lua-version '{}'. Supported versions: lua51, lua52, lua53, lua54, luajit",
                version_str
            )),
        }
    }

    /// Get the human-readable dialect name for the configured version
    pub fn lua_dialect(&self) -> Result<&'static str> {
        Self::parse_lua_version(&self.lua_version)
    }

    /// Set the target Lua version from a string value
    pub fn set_lua_version(&mut self, version: String) -> Result<()> {
        // Validate the version string
        Self::parse_lua_version(&version)?;
        self.lua_version = version;
        Ok(())
    }

    /// Load a single config file from a path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Validate the Lua version
        config.lua_dialect().with_context(|| {
            format!("Invalid lua-version in config file: {}", config.lua_version)
        })?;

        Ok(config)
    }

    /// Load configuration with hierarchical precedence:
    /// 1. CLI-provided config path (highest precedence)
    /// 2. Environment variables (LUPINE_*)
    /// 3. Project config (lupine.toml in current directory)
    /// 4. User config (~/.config/lupine/lupine.toml)
    /// 5. System config (/etc/lupine/lupine.toml or equivalent)
    /// 6. Default values (lowest precedence)
    pub fn load(cli_config_path: Option<&Path>) -> Result<Self> {
        // Start with default configuration
        let mut config = Config::default();

        // 1. Load system config (lowest precedence) - combine into defaults
        if let Some(system_config_path) = system_config_file() {
            if system_config_path.exists() {
                log::debug!("Loading system config from: {:?}", system_config_path);
                let system_config =
                    Self::load_from_file(&system_config_path).with_context(|| {
                        format!("Failed to load system config from {:?}", system_config_path)
                    })?;
                config = system_config.combine(config); // system takes precedence over defaults
            }
        }

        // 2. Load user config
        if let Some(user_config_dir) = user_lupine_config_dir() {
            let user_config_path = user_config_dir.join("lupine.toml");
            if user_config_path.exists() {
                log::debug!("Loading user config from: {:?}", user_config_path);
                let user_config = Self::load_from_file(&user_config_path).with_context(|| {
                    format!("Failed to load user config from {:?}", user_config_path)
                })?;
                config = user_config.combine(config); // user takes precedence over system
            }
        }

        // 3. Load project config (lupine.toml in current directory)
        let project_config_path = PathBuf::from("lupine.toml");
        if project_config_path.exists() {
            log::debug!("Loading project config from: {:?}", project_config_path);
            let project_config = Self::load_from_file(&project_config_path).with_context(|| {
                format!(
                    "Failed to load project config from {:?}",
                    project_config_path
                )
            })?;
            config = project_config.combine(config); // project takes precedence over user
        }

        // 4. Apply environment variables
        let env_config = EnvConfig::from_env();
        config = env_config.apply_to(config);

        // 5. Load CLI-provided config (highest precedence)
        if let Some(cli_config_path) = cli_config_path {
            log::debug!("Loading CLI config from: {:?}", cli_config_path);
            let cli_config = Self::load_from_file(cli_config_path)
                .with_context(|| format!("Failed to load CLI config from {:?}", cli_config_path))?;
            config = cli_config.combine(config); // CLI takes precedence over everything
        }

        // Final validation
        config.lua_dialect().with_context(|| {
            format!("Invalid lua-version in final config: {}", config.lua_version)
        })?;

        Ok(config)
    }
}
