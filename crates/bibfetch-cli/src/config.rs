//! On-disk TOML configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub sources: Option<SourcesConfig>,
    pub fetch: Option<FetchConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub native: Option<bool>,
    pub cassi: Option<bool>,
    pub ltwa: Option<bool>,
    pub ltwa_url: Option<String>,
    pub ltwa_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub bibtex_file: Option<String>,
    pub pdf_dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/bibfetch/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bibfetch").join("config.toml"))
}

/// Load config by cascading CWD `.bibfetch.toml` over the platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".bibfetch.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        sources: Some(SourcesConfig {
            native: pick(&overlay, &base, |s| s.sources.as_ref()?.native),
            cassi: pick(&overlay, &base, |s| s.sources.as_ref()?.cassi),
            ltwa: pick(&overlay, &base, |s| s.sources.as_ref()?.ltwa),
            ltwa_url: pick(&overlay, &base, |s| s.sources.as_ref()?.ltwa_url.clone()),
            ltwa_file: pick(&overlay, &base, |s| s.sources.as_ref()?.ltwa_file.clone()),
        }),
        fetch: Some(FetchConfig {
            bibtex_file: pick(&overlay, &base, |s| s.fetch.as_ref()?.bibtex_file.clone()),
            pdf_dir: pick(&overlay, &base, |s| s.fetch.as_ref()?.pdf_dir.clone()),
        }),
    }
}

fn pick<T>(
    overlay: &ConfigFile,
    base: &ConfigFile,
    get: impl Fn(&ConfigFile) -> Option<T>,
) -> Option<T> {
    get(overlay).or_else(|| get(base))
}
