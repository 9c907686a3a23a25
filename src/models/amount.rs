// ============================================================================
// Structure : AmountField
// ============================================================================
// Un champ de saisie de montant (devise étrangère ou devise de base)
//
// CONCEPTS RUST :
// 1. lazy_static! : regex compilée une seule fois, au premier usage
// 2. Option<Decimal> : None = champ vide ou invalide
// 3. Méthodes "silencieuses" : écriture sans déclencher de réaction
// ============================================================================

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Nombre de décimales affichées pour un montant converti
pub const DISPLAY_SCALE: u32 = 4;

lazy_static! {
    /// Format accepté : pas de zéro initial (sauf "0"), au plus 4 décimales
    static ref AMOUNT_PATTERN: Regex =
        Regex::new(r"^(0|[1-9][0-9]*)(\.[0-9]{1,4})?$").expect("amount pattern is a valid regex");
}

/// Vérifie qu'un texte saisi est un montant valide
pub fn is_valid_amount(text: &str) -> bool {
    AMOUNT_PATTERN.is_match(text)
}

/// Parse un montant si (et seulement si) il respecte le format
pub fn parse_amount(text: &str) -> Option<Decimal> {
    if !is_valid_amount(text) {
        return None;
    }
    Decimal::from_str(text).ok()
}

/// Arrondit à 4 décimales (arrondi standard, 0.5 s'éloigne de zéro)
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Formate avec exactement 4 décimales (ex: "135.0000")
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_display(value);
    rounded.rescale(DISPLAY_SCALE);
    rounded.to_string()
}

/// Quel champ de montant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    /// Montant en devise étrangère
    Foreign,
    /// Montant en devise de base (CAD)
    Base,
}

impl AmountKind {
    pub fn other(self) -> Self {
        match self {
            AmountKind::Foreign => AmountKind::Base,
            AmountKind::Base => AmountKind::Foreign,
        }
    }
}

/// Champ de saisie d'un montant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmountField {
    raw_text: String,
    numeric_value: Option<Decimal>,
    enabled: bool,
}

impl AmountField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.raw_text
    }

    /// Valeur numérique, None si vide ou invalide
    pub fn value(&self) -> Option<Decimal> {
        self.numeric_value
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }

    /// Non vide ET au bon format
    pub fn is_valid(&self) -> bool {
        self.numeric_value.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Remplace le texte et recalcule la valeur numérique
    ///
    /// Retourne true si le texte a effectivement changé.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.raw_text == text {
            return false;
        }
        self.raw_text = text.to_string();
        self.numeric_value = parse_amount(text);
        true
    }

    /// Écrit un montant calculé
    ///
    /// N'émet aucun changement : c'est l'appelant (la machine d'état) qui
    /// décide de ne pas réagir à cette écriture.
    pub fn write_silently(&mut self, value: Decimal) {
        self.raw_text = format_amount(value);
        self.numeric_value = Some(round_display(value));
    }

    /// Vide le champ sans émettre de changement
    pub fn clear_silently(&mut self) {
        self.raw_text.clear();
        self.numeric_value = None;
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_amounts() {
        for text in ["0", "0.5", "100", "1.2345", "12.34", "999999", "0.0001"] {
            assert!(is_valid_amount(text), "{} should be valid", text);
        }
    }

    #[test]
    fn test_invalid_amounts() {
        for text in ["", "01.5", "00", "012", "12.34567", ".5", "5.", "1,5", "-1", "abc", " 1"] {
            assert!(!is_valid_amount(text), "{:?} should be invalid", text);
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("01"), None);
    }

    #[test]
    fn test_format_amount_four_decimals() {
        assert_eq!(format_amount(dec!(135)), "135.0000");
        assert_eq!(format_amount(dec!(1.23456)), "1.2346");
        assert_eq!(format_amount(dec!(1.23455)), "1.2346");
        assert_eq!(format_amount(dec!(0.00004)), "0.0000");
    }

    #[test]
    fn test_set_text_tracks_validity() {
        let mut field = AmountField::new();
        assert!(field.set_text("12.5"));
        assert_eq!(field.value(), Some(dec!(12.5)));

        assert!(field.set_text("012"));
        assert!(!field.is_valid());
        assert!(!field.is_empty());

        assert!(!field.set_text("012"));
    }

    #[test]
    fn test_silent_writes() {
        let mut field = AmountField::new();
        field.write_silently(dec!(3.14159));
        assert_eq!(field.text(), "3.1416");
        assert_eq!(field.value(), Some(dec!(3.1416)));

        field.clear_silently();
        assert!(field.is_empty());
        assert_eq!(field.value(), None);
    }

    #[test]
    fn test_amount_kind_other() {
        assert_eq!(AmountKind::Foreign.other(), AmountKind::Base);
        assert_eq!(AmountKind::Base.other(), AmountKind::Foreign);
    }
}
