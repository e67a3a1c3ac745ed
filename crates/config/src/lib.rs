//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `VOCA_`, where `__` separates
//!    nesting levels (`VOCA_LOADER__WORKERS=4`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use voca_assets::{AssetLayout, PoolConfig};

pub const ENV_PREFIX: &str = "VOCA_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assets: AssetsConfig,
    pub loader: LoaderConfig,
}

/// Where the packaged assets live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding the packaged assets. The command line can override
    /// it; without either, the current directory is used.
    pub root: Option<PathBuf>,
    pub images: PathBuf,
    pub fonts: PathBuf,
    pub sounds: PathBuf,
    pub data: PathBuf,
    pub views: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let layout = AssetLayout::default();
        Self {
            root: None,
            images: layout.images,
            fonts: layout.fonts,
            sounds: layout.sounds,
            data: layout.data,
            views: layout.views,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Worker threads; unset means one per available core.
    pub workers: Option<usize>,
    pub shutdown_grace_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: None,
            shutdown_grace_ms: 800,
        }
    }
}

impl Config {
    /// `config.toml` in the platform's per-user configuration directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "Vocaotology", "vocaotology").ok_or_raise(|| ErrorKind::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from [`default_path`](Self::default_path)
    /// when no path is given.
    ///
    /// An explicit path must exist; a missing default file just means
    /// defaults and environment apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::Missing(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => match Self::default_path() {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(err) => {
                    let kind: &ErrorKind = &err;
                    tracing::debug!(error = %kind, "no default configuration file");
                    None
                },
            },
        };
        if let Some(file) = &file {
            tracing::debug!(path = %file.display(), "loading configuration file");
        }
        Self::from_figment(Self::figment(file.as_deref())?)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        if config.loader.workers == Some(0) {
            exn::bail!(ErrorKind::Invalid);
        }
        Ok(config)
    }

    pub fn layout(&self) -> AssetLayout {
        AssetLayout {
            images: self.assets.images.clone(),
            fonts: self.assets.fonts.clone(),
            sounds: self.assets.sounds.clone(),
            data: self.assets.data.clone(),
            views: self.assets.views.clone(),
        }
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            workers: self.loader.workers.and_then(NonZeroUsize::new),
            shutdown_grace: Duration::from_millis(self.loader.shutdown_grace_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    // Every test that reads the environment runs inside a `Jail`, which
    // serializes them and restores any variables they set.

    #[test]
    fn defaults_match_packaged_layout() {
        Jail::expect_with(|_| {
            let config = Config::from_figment(Config::figment(None).map_err(|e| format!("{e:?}"))?).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.layout(), AssetLayout::default());
            assert_eq!(config.pool(), PoolConfig::default());
            assert!(config.assets.root.is_none());
            Ok(())
        });
    }

    #[rstest]
    #[case("config.toml", "[loader]\nworkers = 3\nshutdown_grace_ms = 250\n")]
    #[case("config.yaml", "loader:\n  workers: 3\n  shutdown_grace_ms: 250\n")]
    #[case("config.yml", "loader:\n  workers: 3\n  shutdown_grace_ms: 250\n")]
    #[case("config.json", r#"{"loader": {"workers": 3, "shutdown_grace_ms": 250}}"#)]
    fn file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load(Some(Path::new(name))).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.loader.workers, Some(3));
            assert_eq!(config.pool().shutdown_grace, Duration::from_millis(250));
            // Untouched sections keep their defaults.
            assert_eq!(config.assets, AssetsConfig::default());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "voca.toml",
                r#"
                [assets]
                root = "/opt/vocaotology"
                data = "words"

                [loader]
                workers = 2
                "#,
            )?;
            jail.set_env("VOCA_LOADER__WORKERS", "6");
            jail.set_env("VOCA_ASSETS__VIEWS", "fxml");

            let config = Config::load(Some(Path::new("voca.toml"))).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.loader.workers, Some(6));
            assert_eq!(config.assets.root.as_deref(), Some(Path::new("/opt/vocaotology")));
            assert_eq!(config.layout().data, PathBuf::from("words"));
            assert_eq!(config.layout().views, PathBuf::from("fxml"));
            assert_eq!(config.layout().images, AssetLayout::default().images);
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::Missing(path));
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "workers=1").unwrap();
        assert!(matches!(*Config::load(Some(&path)).unwrap_err(), ErrorKind::UnsupportedFormat(_)));
    }

    #[rstest]
    #[case("[loader]\nworkers = 0\n")]
    #[case("[loader]\nworkers = \"many\"\n")]
    #[case("[loader]\nshutdown_grace_ms = -1\n")]
    fn rejects_invalid_values(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", contents)?;
            let err = Config::load(Some(Path::new("config.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid);
            Ok(())
        });
    }
}
