// ============================================================================
// Structures : Observation, RateTable, RateWindow
// ============================================================================
// Table des taux quotidiens publiés par la Banque du Canada
//
// CONCEPTS RUST :
// 1. NaiveDate : date sans fuseau (une observation = un jour ouvrable)
// 2. HashMap<String, Decimal> : taux par clé de série ("FXUSDCAD")
// 3. BTreeSet : ensemble ordonné des dates valides
// ============================================================================

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::currency::{CurrencyOption, BASE_CURRENCY};

/// Clé de série d'une devise dans la table ("FX{code}CAD")
///
/// La valeur associée est le nombre de CAD pour 1 unité de la devise.
pub fn pair_key(alpha_code: &str) -> String {
    format!("FX{}{}", alpha_code, BASE_CURRENCY)
}

/// Une journée de taux publiés
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,

    /// Taux par clé de série
    pub rates: HashMap<String, Decimal>,
}

impl Observation {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: HashMap::new(),
        }
    }

    /// Ajoute un taux (builder, pratique pour les tests et le parsing)
    pub fn with_rate(mut self, alpha_code: &str, rate: Decimal) -> Self {
        self.rates.insert(pair_key(alpha_code), rate);
        self
    }

    /// Taux de la devise ce jour-là, si publié
    pub fn rate_for(&self, alpha_code: &str) -> Option<Decimal> {
        self.rates.get(&pair_key(alpha_code)).copied()
    }
}

/// Table des observations, triée par date croissante
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    observations: Vec<Observation>,
}

impl RateTable {
    /// Construit la table ; les observations sont triées par date
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Vrai si TOUTES les observations contiennent un taux pour la devise
    ///
    /// Une table vide ne couvre aucune devise.
    pub fn covers(&self, alpha_code: &str) -> bool {
        !self.observations.is_empty()
            && self
                .observations
                .iter()
                .all(|o| o.rate_for(alpha_code).is_some())
    }

    /// Dernière observation publiée le `date` ou avant
    pub fn observation_on_or_before(&self, date: NaiveDate) -> Option<&Observation> {
        // partition_point : index de la première observation strictement après `date`
        let idx = self.observations.partition_point(|o| o.date <= date);
        idx.checked_sub(1).map(|i| &self.observations[i])
    }

    /// Ensemble ordonné des dates publiées
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }
}

/// Garde uniquement les devises couvertes sur toute la période
///
/// Une devise avec un seul jour manquant est exclue entièrement.
pub fn filter_fully_covered(
    options: Vec<CurrencyOption>,
    table: &RateTable,
) -> Vec<CurrencyOption> {
    options
        .into_iter()
        .filter(|option| table.covers(&option.alpha_code))
        .collect()
}

/// Plage de dates pour lesquelles des taux existent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub valid_dates: BTreeSet<NaiveDate>,
}

impl RateWindow {
    /// Calcule la fenêtre à partir de la table et de "aujourd'hui"
    ///
    /// `max_date` est toujours `today` (jamais tiré des données, qui peuvent
    /// contenir une date future). Les dates publiées après `today` sont ignorées.
    pub fn compute(table: &RateTable, today: NaiveDate) -> Self {
        let min_date = table.first_date().unwrap_or(today).min(today);
        let valid_dates = table
            .dates()
            .into_iter()
            .filter(|date| *date <= today)
            .collect();

        Self {
            min_date,
            max_date: today,
            valid_dates,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min_date <= date && date <= self.max_date
    }

    /// Date publiée précédente (strictement avant `date`)
    pub fn previous_valid(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.valid_dates.range(..date).next_back().copied()
    }

    /// Date publiée suivante (strictement après `date`)
    pub fn next_valid(&self, date: NaiveDate) -> Option<NaiveDate> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.valid_dates.range((Excluded(date), Unbounded)).next().copied()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
