use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::seating::SeatingPolicy;
use crate::store::STORE_FILE;

pub const APP_DIR: &str = "poker-night";
pub const CONFIG_FILE: &str = "poker-night.toml";

fn config_paths(filename: &str) -> Vec<PathBuf> {
	let mut paths = Vec::new();

	if let Some(config_dir) = dirs::config_dir() {
		paths.push(config_dir.join(APP_DIR).join(filename));
	}

	paths.push(PathBuf::from("config").join(filename));

	paths
}

fn find_config(filename: &str) -> Option<PathBuf> {
	config_paths(filename).into_iter().find(|p| p.exists())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_addr")]
	pub addr: String,
}

fn default_addr() -> String {
	"127.0.0.1:7777".to_string()
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self { addr: default_addr() }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
	#[serde(default)]
	pub data_dir: Option<PathBuf>,
	#[serde(default)]
	pub log_dir: Option<PathBuf>,
	#[serde(default = "default_buy_in")]
	pub default_buy_in: f32,
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub seating: SeatingPolicy,
}

fn default_buy_in() -> f32 {
	20.0
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			data_dir: None,
			log_dir: None,
			default_buy_in: default_buy_in(),
			server: ServerConfig::default(),
			seating: SeatingPolicy::default(),
		}
	}
}

impl AppConfig {
	pub fn data_path(&self) -> PathBuf {
		if let Some(dir) = &self.data_dir {
			return dir.clone();
		}
		match dirs::data_dir() {
			Some(dir) => dir.join(APP_DIR),
			None => PathBuf::from("data"),
		}
	}

	pub fn store_path(&self) -> PathBuf {
		self.data_path().join(STORE_FILE)
	}

	pub fn log_path(&self) -> PathBuf {
		match &self.log_dir {
			Some(dir) => dir.clone(),
			None => self.data_path().join("logs"),
		}
	}
}

pub fn parse(content: &str) -> Result<AppConfig, String> {
	toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
}

pub fn load_from<P: AsRef<Path>>(path: P) -> Result<AppConfig, String> {
	let content = fs::read_to_string(&path)
		.map_err(|e| format!("Failed to read {}: {}", path.as_ref().display(), e))?;
	parse(&content)
}

pub fn load() -> Result<AppConfig, String> {
	match find_config(CONFIG_FILE) {
		Some(path) => load_from(path),
		None => Ok(AppConfig::default()),
	}
}
