// ============================================================================
// Moteur de conversion
// ============================================================================
// Fonctions pures au-dessus d'une RateTable chargée : aucun état propre
//
// CONCEPTS RUST :
// 1. Lifetimes : ConversionEngine<'a> emprunte la table, sans la copier
// 2. Option chaining avec ? : une date ou un taux manquant donne None
// 3. checked_div : pas de panic sur un taux nul
// ============================================================================

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::amount::round_display;
use crate::models::currency::BASE_CURRENCY;
use crate::models::rate_table::{Observation, RateTable};

/// Taux obtenu pour une date demandée
///
/// `rate_date` est la date réellement utilisée (dernière publication à la
/// date demandée ou avant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuote {
    pub rate: Decimal,
    pub rate_date: NaiveDate,
}

/// Montant converti et arrondi à 4 décimales
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedAmount {
    pub amount: Decimal,
    pub rate_date: NaiveDate,
}

/// Dernière conversion réussie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastConversion {
    pub from_code: String,
    pub to_code: String,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
}

impl LastConversion {
    /// Résumé affichable : "1 USD = 1.3567 CAD (2024-03-01)"
    pub fn summary(&self) -> String {
        format!(
            "1 {} = {} {} ({})",
            self.from_code,
            round_display(self.rate).normalize(),
            self.to_code,
            self.rate_date.format("%Y-%m-%d")
        )
    }
}

/// Requêtes de taux et de conversion sur une table
#[derive(Debug, Clone, Copy)]
pub struct ConversionEngine<'a> {
    table: &'a RateTable,
}

impl<'a> ConversionEngine<'a> {
    pub fn new(table: &'a RateTable) -> Self {
        Self { table }
    }

    /// Taux from → to à la date demandée
    pub fn rate(&self, from: &str, to: &str, on_date: NaiveDate) -> Option<RateQuote> {
        let observation = self.table.observation_on_or_before(on_date)?;

        let rate = if from == to {
            Decimal::ONE
        } else {
            let from_in_base = base_value(observation, from)?;
            let to_in_base = base_value(observation, to)?;
            from_in_base.checked_div(to_in_base)?
        };

        Some(RateQuote {
            rate,
            rate_date: observation.date,
        })
    }

    /// Convertit un montant ; le résultat est arrondi à 4 décimales
    pub fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        on_date: NaiveDate,
    ) -> Option<ConvertedAmount> {
        let quote = self.rate(from, to, on_date)?;
        let converted = amount.checked_mul(quote.rate)?;

        Some(ConvertedAmount {
            amount: round_display(converted),
            rate_date: quote.rate_date,
        })
    }

    /// Dates pour lesquelles un taux a été publié
    pub fn valid_dates(&self) -> BTreeSet<NaiveDate> {
        self.table.dates()
    }
}

/// Valeur en CAD d'une unité de la devise ce jour-là
fn base_value(observation: &Observation, alpha_code: &str) -> Option<Decimal> {
    if alpha_code == BASE_CURRENCY {
        Some(Decimal::ONE)
    } else {
        observation.rate_for(alpha_code)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
