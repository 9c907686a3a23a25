// ============================================================================
// Structure : CurrencyOption
// ============================================================================
// Représente une devise étrangère proposée dans le sélecteur
//
// CONCEPTS RUST :
// 1. &'static str : les métadonnées sont compilées dans le binaire
// 2. Iterators : filtrage de la liste sans copie inutile
// 3. HashSet/BTreeSet : tests d'appartenance en O(1)/O(log n)
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

/// Code de la devise domestique (base de toutes les conversions)
pub const BASE_CURRENCY: &str = "CAD";

/// Une devise proposée à l'utilisateur
///
/// L'identité est le code alphabétique ISO 4217 (3 lettres).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyOption {
    /// Code ISO (ex: "USD")
    pub alpha_code: String,

    /// Nom complet (ex: "US dollar")
    pub full_name: String,
}

impl CurrencyOption {
    pub fn new(alpha_code: &str, full_name: &str) -> Self {
        Self {
            alpha_code: alpha_code.to_string(),
            full_name: full_name.to_string(),
        }
    }

    /// Texte sur lequel porte la recherche : "{full_name} {alpha_code}"
    pub fn search_text(&self) -> String {
        format!("{} {}", self.full_name, self.alpha_code)
    }

    /// Vrai si la saisie libre correspond à cette devise
    ///
    /// Correspondance par sous-chaîne, insensible à la casse. Les espaces
    /// de la saisie comptent.
    pub fn matches(&self, query: &str) -> bool {
        self.search_text()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

impl fmt::Display for CurrencyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name, self.alpha_code)
    }
}

// ============================================================================
// Métadonnées statiques
// ============================================================================
// Devises publiées quotidiennement par la Banque du Canada
// (groupe FX_RATES_DAILY). La disponibilité réelle est vérifiée au chargement.
// ============================================================================

/// (code, nom) de toutes les devises connues
pub const KNOWN_CURRENCIES: &[(&str, &str)] = &[
    ("AUD", "Australian dollar"),
    ("BRL", "Brazilian real"),
    ("CNY", "Chinese renminbi"),
    ("EUR", "European euro"),
    ("HKD", "Hong Kong dollar"),
    ("INR", "Indian rupee"),
    ("IDR", "Indonesian rupiah"),
    ("JPY", "Japanese yen"),
    ("MYR", "Malaysian ringgit"),
    ("MXN", "Mexican peso"),
    ("NZD", "New Zealand dollar"),
    ("NOK", "Norwegian krone"),
    ("PEN", "Peruvian new sol"),
    ("RUB", "Russian ruble"),
    ("SAR", "Saudi riyal"),
    ("SGD", "Singapore dollar"),
    ("ZAR", "South African rand"),
    ("KRW", "South Korean won"),
    ("SEK", "Swedish krona"),
    ("CHF", "Swiss franc"),
    ("TWD", "Taiwanese dollar"),
    ("THB", "Thai baht"),
    ("TRY", "Turkish lira"),
    ("GBP", "UK pound sterling"),
    ("USD", "US dollar"),
    ("VND", "Vietnamese dong"),
];

/// Construit la liste des options à partir des métadonnées statiques
pub fn known_currencies() -> Vec<CurrencyOption> {
    KNOWN_CURRENCIES
        .iter()
        .map(|&(code, name)| CurrencyOption::new(code, name))
        .collect()
}

/// Garde uniquement les devises présentes dans la liste de disponibilité
///
/// Une devise doit figurer à la fois dans les métadonnées ET dans les codes
/// renvoyés par la source ; l'ordre des métadonnées est conservé.
pub fn intersect_available(
    options: Vec<CurrencyOption>,
    available: &BTreeSet<String>,
) -> Vec<CurrencyOption> {
    options
        .into_iter()
        .filter(|option| available.contains(&option.alpha_code))
        .collect()
}

/// Filtre les options pour une saisie libre
pub fn filter_options<'a>(options: &'a [CurrencyOption], query: &str) -> Vec<&'a CurrencyOption> {
    options.iter().filter(|option| option.matches(query)).collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(options: &[CurrencyOption]) -> Vec<&str> {
        options.iter().map(|o| o.alpha_code.as_str()).collect()
    }

    #[test]
    fn test_intersection_drops_unknown_codes() {
        let metadata = vec![
            CurrencyOption::new("CAD", "Canadian dollar"),
            CurrencyOption::new("USD", "US dollar"),
            CurrencyOption::new("EUR", "European euro"),
            CurrencyOption::new("XYZ", "Imaginary unit"),
        ];
        let available: BTreeSet<String> =
            ["CAD", "USD", "EUR"].iter().map(|s| s.to_string()).collect();

        let kept = intersect_available(metadata, &available);
        assert_eq!(codes(&kept), vec!["CAD", "USD", "EUR"]);
    }

    #[test]
    fn test_intersection_ignores_codes_without_metadata() {
        let available: BTreeSet<String> =
            ["USD", "QQQ"].iter().map(|s| s.to_string()).collect();

        let kept = intersect_available(known_currencies(), &available);
        assert_eq!(codes(&kept), vec!["USD"]);
    }

    #[test]
    fn test_matches_name_and_code_case_insensitive() {
        let usd = CurrencyOption::new("USD", "US dollar");
        assert!(usd.matches("us"));
        assert!(usd.matches("DOLLAR"));
        assert!(usd.matches("dollar usd"));
        assert!(usd.matches(""));
        assert!(!usd.matches("euro"));
    }

    #[test]
    fn test_matches_keeps_query_spaces() {
        let usd = CurrencyOption::new("USD", "US dollar");
        assert!(usd.matches("dollar "));
        assert!(!usd.matches("usd "));
        assert!(!usd.matches(" us dollar"));
    }

    #[test]
    fn test_filter_options() {
        let options = known_currencies();
        let hits = filter_options(&options, "dollar");
        assert!(hits.iter().all(|o| o.full_name.contains("dollar")));
        assert!(hits.iter().any(|o| o.alpha_code == "USD"));
        assert!(hits.iter().all(|o| o.alpha_code != "EUR"));
    }

    #[test]
    fn test_display() {
        let eur = CurrencyOption::new("EUR", "European euro");
        assert_eq!(eur.to_string(), "European euro (EUR)");
    }
}
