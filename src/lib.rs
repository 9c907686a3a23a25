// ============================================================================
// LazyFX - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests d'intégration
// ============================================================================

pub mod api;       // Sources de taux (API Valet)
pub mod app;       // Machine d'état du convertisseur
pub mod config;    // Réglages (fichier TOML + CLI)
pub mod engine;    // Calcul des taux croisés
pub mod freshness; // Détection de nouveaux taux publiés
pub mod models;    // Structures de données
pub mod ui;        // Interface utilisateur
pub mod worker;    // Thread de chargement en arrière-plan
