use serde::Deserialize;
use std::path::Path;

const CONFIG_FILE: &str = "acadreportd.toml";

/// Workspace-level settings. Everything has a default so a bare workspace
/// directory works without any config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_file: String,
    pub csv_dir: String,
    pub reports_dir: String,
    pub photo_dir: String,
    pub photo_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_file: "academic.sqlite3".into(),
            csv_dir: "assets".into(),
            reports_dir: "reports".into(),
            photo_dir: "static/imgs/students".into(),
            photo_timeout_secs: 5,
        }
    }
}

/// Load `acadreportd.toml` from the workspace, falling back to defaults
/// when the file is absent.
pub fn load(workspace: &Path) -> anyhow::Result<AppConfig> {
    let path = workspace.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    let cfg = toml::from_str(&raw)?;
    Ok(cfg)
}
