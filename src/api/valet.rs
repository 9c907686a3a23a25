// ============================================================================
// API Client : Banque du Canada (Valet)
// ============================================================================
// Récupère la liste des devises publiées et l'historique des taux quotidiens
// (groupe de séries FX_RATES_DAILY)
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte
// 3. Serde : désérialisation JSON (structures typées + serde_json::Value)
// ============================================================================

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::api::RateSource;
use crate::models::currency::BASE_CURRENCY;
use crate::models::rate_table::{Observation, RateTable};

/// URL de base par défaut de l'API Valet
pub const DEFAULT_BASE_URL: &str = "https://www.bankofcanada.ca/valet";

/// Groupe de séries des taux quotidiens
pub const FX_GROUP: &str = "FX_RATES_DAILY";

/// Préfixe des clés de série ("FXUSDCAD")
const SERIES_PREFIX: &str = "FX";

// ============================================================================
// Structures pour parser les réponses JSON de Valet
// ============================================================================

/// Réponse de /groups/{group}/json
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupResponse {
    group_details: GroupDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDetails {
    /// Séries du groupe, indexées par clé ("FXUSDCAD")
    group_series: HashMap<String, Value>,
}

/// Réponse de /observations/group/{group}/json
///
/// Chaque observation est un objet : { "d": "2024-03-01", "FXUSDCAD": { "v": "1.3567" }, ... }
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<HashMap<String, Value>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client HTTP de l'API Valet
#[derive(Debug, Clone)]
pub struct ValetClient {
    client: reqwest::Client,
    base_url: String,
    start_date: NaiveDate,
}

impl ValetClient {
    /// Crée un client ; `start_date` borne l'historique demandé
    pub fn new(base_url: &str, start_date: NaiveDate) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lazyfx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            start_date,
        })
    }

    fn group_url(&self) -> String {
        format!("{}/groups/{}/json", self.base_url, FX_GROUP)
    }

    fn observations_url(&self) -> String {
        format!(
            "{}/observations/group/{}/json?start_date={}",
            self.base_url,
            FX_GROUP,
            self.start_date.format("%Y-%m-%d")
        )
    }

    /// GET + vérification du statut HTTP + parsing JSON
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Sending HTTP request to Valet");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Échec de la requête HTTP vers Valet")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            error!(status = %status, "Valet returned error status");
            anyhow::bail!("Valet a retourné une erreur : HTTP {}", status);
        }

        response
            .json::<T>()
            .await
            .context("Échec du parsing JSON de la réponse Valet")
    }
}

#[async_trait]
impl RateSource for ValetClient {
    #[instrument(skip(self))]
    async fn list_currencies(&self) -> Result<BTreeSet<String>> {
        let response: GroupResponse = self.get_json(&self.group_url()).await?;
        let codes = parse_series_codes(response.group_details.group_series.keys());

        info!(currencies = codes.len(), "Successfully fetched currency list");
        Ok(codes)
    }

    #[instrument(skip(self), fields(start_date = %self.start_date))]
    async fn list_observations(&self) -> Result<RateTable> {
        let response: ObservationsResponse = self.get_json(&self.observations_url()).await?;
        let table = parse_observations(response.observations)?;

        info!(observations = table.len(), "Successfully fetched rate observations");
        Ok(table)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// "FXUSDCAD" -> "USD" ; les autres clés sont ignorées
fn series_code(key: &str) -> Option<&str> {
    let code = key.strip_prefix(SERIES_PREFIX)?.strip_suffix(BASE_CURRENCY)?;
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())).then_some(code)
}

fn parse_series_codes<'a>(keys: impl Iterator<Item = &'a String>) -> BTreeSet<String> {
    keys.filter_map(|key| series_code(key))
        .map(str::to_string)
        .collect()
}

/// Convertit les observations JSON en RateTable
///
/// Une valeur absente ou non numérique est simplement omise (la devise sera
/// alors exclue par le filtre de couverture). Une date invalide est une erreur.
fn parse_observations(raw: Vec<HashMap<String, Value>>) -> Result<RateTable> {
    let mut observations = Vec::with_capacity(raw.len());
    let mut skipped_values = 0;

    for row in raw {
        let date_text = row
            .get("d")
            .and_then(Value::as_str)
            .context("Observation sans date")?;
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
            .with_context(|| format!("Date d'observation invalide : {}", date_text))?;

        let mut observation = Observation::new(date);
        for (key, value) in &row {
            if series_code(key).is_none() {
                continue;
            }
            match value
                .get("v")
                .and_then(Value::as_str)
                .and_then(|v| Decimal::from_str(v.trim()).ok())
            {
                Some(rate) => {
                    observation.rates.insert(key.clone(), rate);
                }
                None => skipped_values += 1,
            }
        }
        observations.push(observation);
    }

    if skipped_values > 0 {
        warn!(skipped = skipped_values, "Skipped observation values that are missing or not numeric");
    }

    Ok(RateTable::new(observations))
}

// ============================================================================
// Tests unitaires
// ============================================================================
