//! Configuration de l'outil en ligne de commande
//!
//! Fichier JSON optionnel, indiqué par `--config` ou `$BALOON_CONFIG`.
//! Les options de la ligne de commande priment sur ces valeurs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Variable d'environnement pointant vers le fichier de configuration
pub const CONFIG_ENV: &str = "BALOON_CONFIG";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Formats cibles quand `--to` est absent
    pub default_targets: Vec<String>,

    /// Dossier de sortie par défaut (dossier de la source sinon)
    pub output_dir: Option<PathBuf>,

    /// Nombre de threads pour les conversions par lot
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_targets: vec!["geojson".to_string()],
            output_dir: None,
            jobs: None,
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge le fichier de `$BALOON_CONFIG` s'il est défini
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)).map(Some),
            _ => Ok(None),
        }
    }

    /// Résout la configuration: fichier explicite, puis environnement, puis défaut
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::from_env()?.unwrap_or_default()),
        }
    }

    /// Cibles effectives: celles de la ligne de commande, sinon celles du fichier
    pub fn targets(&self, cli: &[String]) -> Vec<String> {
        if cli.is_empty() {
            self.default_targets.clone()
        } else {
            cli.to_vec()
        }
    }
}
