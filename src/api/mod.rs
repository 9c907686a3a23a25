// ============================================================================
// Module : api
// ============================================================================
// Ce module contient les sources de taux de change
//
// CONCEPT RUST : Trait async
// - RateSource décrit CE QUE fournit une source (devises, observations)
// - ValetClient est l'implémentation HTTP (Banque du Canada)
// - Les tests utilisent une source en mémoire
// ============================================================================

pub mod valet; // Client API Valet (Banque du Canada)

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RateTable;

/// Source des devises disponibles et des taux historiques
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Codes des devises actuellement publiées
    async fn list_currencies(&self) -> Result<BTreeSet<String>>;

    /// Table des observations quotidiennes
    async fn list_observations(&self) -> Result<RateTable>;
}

// Re-export du client principal
pub use valet::ValetClient;
