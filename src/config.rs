// ============================================================================
// Configuration
// ============================================================================
// Réglages lus depuis ~/.config/lazyfx/config.toml, puis surchargés par la
// ligne de commande et l'environnement (voir main.rs)
//
// CONCEPTS RUST :
// 1. #[serde(default)] : chaque clé absente prend sa valeur par défaut
// 2. Option<&Path> : chemin explicite ou emplacement standard
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::valet::DEFAULT_BASE_URL;
use crate::freshness::{DEFAULT_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL};

/// Variable d'environnement qui force la question de rechargement
pub const FORCE_REFRESH_ENV: &str = "LAZYFX_FORCE_REFRESH";

/// Réglages de l'application
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Intervalle entre deux vérifications de fraîcheur (secondes)
    pub refresh_interval_secs: u64,

    /// Debug : considère toujours que de nouveaux taux sont disponibles
    pub force_refresh_prompt: bool,

    /// URL de base de l'API Valet
    pub valet_base_url: String,

    /// Première date d'observation demandée
    pub observations_start_date: NaiveDate,

    /// Répertoire des fichiers de log
    pub log_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            force_refresh_prompt: false,
            valet_base_url: DEFAULT_BASE_URL.to_string(),
            // Première publication de la série FX_RATES_DAILY actuelle
            observations_start_date: NaiveDate::from_ymd_opt(2017, 1, 3).unwrap_or_default(),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl Settings {
    /// Emplacement standard : {config_dir}/lazyfx/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lazyfx").join("config.toml"))
    }

    /// Charge les réglages
    ///
    /// - chemin explicite : le fichier doit exister
    /// - sinon emplacement standard : fichier absent = valeurs par défaut
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Impossible de lire la configuration {}", path.display()))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Configuration invalide : {}", path.display()))?;

        info!(?path, "Configuration loaded");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        validate_refresh_interval(settings.refresh_interval_secs)
            .context("refresh_interval_secs invalide")?;
        Ok(settings)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Intervalle de vérification : entre 1 seconde et une journée
pub fn validate_refresh_interval(secs: u64) -> Result<()> {
    if secs == 0 {
        anyhow::bail!("l'intervalle doit être supérieur à 0");
    }
    if secs > MAX_REFRESH_INTERVAL.as_secs() {
        anyhow::bail!(
            "l'intervalle ({} s) dépasse le maximum de {} s",
            secs,
            MAX_REFRESH_INTERVAL.as_secs()
        );
    }
    Ok(())
}

/// Interprète la valeur de LAZYFX_FORCE_REFRESH ("1", "true", "yes", "on")
pub fn env_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

// ============================================================================
// Tests unitaires
// ============================================================================
