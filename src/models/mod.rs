// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod amount;     // Champs de montant et validation (fichier amount.rs)
pub mod currency;   // Devises proposées (fichier currency.rs)
pub mod rate_table; // Observations quotidiennes et fenêtre de dates (fichier rate_table.rs)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use lazyfx::models::currency::CurrencyOption;
// On peut faire : use lazyfx::models::CurrencyOption;
pub use amount::{AmountField, AmountKind};
pub use currency::{CurrencyOption, BASE_CURRENCY};
pub use rate_table::{Observation, RateTable, RateWindow};
