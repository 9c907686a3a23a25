// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Background async worker avec channels
// - Thread séparé qui exécute les chargements (appels HTTP)
// - Reçoit des WorkerCommand via un channel (command_rx)
// - Renvoie des Intent (CurrenciesLoaded / RatesLoaded) via un autre channel
// - L'UI ne bloque jamais pendant un chargement
// ============================================================================

use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::api::RateSource;
use crate::app::{Effect, FetchFailure, Intent};

/// Commandes envoyées au worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Charger la liste des devises pour ce cycle
    FetchCurrencies { cycle: u64 },
    /// Charger la table des taux pour ce cycle
    FetchRates { cycle: u64 },
}

impl WorkerCommand {
    /// Commande correspondant à un effet, si l'effet concerne le worker
    pub fn from_effect(effect: &Effect) -> Option<Self> {
        match *effect {
            Effect::FetchCurrencies { cycle } => Some(WorkerCommand::FetchCurrencies { cycle }),
            Effect::FetchRates { cycle } => Some(WorkerCommand::FetchRates { cycle }),
            Effect::PromptRefresh | Effect::Focus { .. } => None,
        }
    }
}

/// Exécute une commande et construit l'intent de fin de chargement
///
/// Les erreurs ne remontent pas : elles deviennent un FetchFailure dans l'intent.
pub async fn execute(source: &dyn RateSource, command: WorkerCommand) -> Intent {
    match command {
        WorkerCommand::FetchCurrencies { cycle } => {
            let result = source.list_currencies().await.map_err(|e| {
                error!(cycle, error = ?e, "Failed to load currencies");
                FetchFailure::from(e)
            });
            Intent::CurrenciesLoaded { cycle, result }
        }
        WorkerCommand::FetchRates { cycle } => {
            let result = source.list_observations().await.map_err(|e| {
                error!(cycle, error = ?e, "Failed to load rates");
                FetchFailure::from(e)
            });
            Intent::RatesLoaded { cycle, result }
        }
    }
}

/// Lance le worker thread
///
/// CONCEPT RUST : Thread + async runtime
/// - std::thread::spawn() : crée un thread OS
/// - tokio::runtime::Runtime : runtime async dans ce thread
/// - Le thread se termine quand command_tx est droppé (channel fermé)
pub fn spawn_background_worker(
    source: Arc<dyn RateSource>,
    command_rx: mpsc::Receiver<WorkerCommand>,
    result_tx: mpsc::Sender<Intent>,
) -> Result<JoinHandle<()>> {
    // Runtime créé avant le spawn : une erreur remonte à l'appelant
    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;

    let handle = std::thread::Builder::new()
        .name("lazyfx-worker".to_string())
        .spawn(move || {
            // Boucle de traitement des commandes : recv() échoue quand le
            // channel est fermé, ce qui termine le thread
            while let Ok(command) = command_rx.recv() {
                info!(?command, "Worker received command");
                let intent = runtime.block_on(execute(source.as_ref(), command));

                if result_tx.send(intent).is_err() {
                    info!("Worker thread exiting (result channel closed)");
                    return;
                }
            }
            info!("Worker thread exiting (channel closed)");
        })
        .context("Échec du lancement du worker thread")?;

    Ok(handle)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::models::RateTable;

    struct FailingSource;

    #[async_trait]
    impl RateSource for FailingSource {
        async fn list_currencies(&self) -> Result<BTreeSet<String>> {
            anyhow::bail!("HTTP 500")
        }

        async fn list_observations(&self) -> Result<RateTable> {
            Err(anyhow::anyhow!("connection reset")).context("Échec de la requête HTTP vers Valet")
        }
    }

    #[test]
    fn test_from_effect() {
        assert_eq!(
            WorkerCommand::from_effect(&Effect::FetchRates { cycle: 3 }),
            Some(WorkerCommand::FetchRates { cycle: 3 })
        );
        assert_eq!(WorkerCommand::from_effect(&Effect::PromptRefresh), None);
    }

    #[tokio::test]
    async fn test_execute_maps_errors_to_fetch_failure() {
        let intent = execute(&FailingSource, WorkerCommand::FetchCurrencies { cycle: 7 }).await;
        match intent {
            Intent::CurrenciesLoaded { cycle, result } => {
                assert_eq!(cycle, 7);
                assert_eq!(result.unwrap_err().message, "HTTP 500");
            }
            other => panic!("unexpected intent {:?}", other),
        }

        let intent = execute(&FailingSource, WorkerCommand::FetchRates { cycle: 8 }).await;
        match intent {
            Intent::RatesLoaded { result, .. } => {
                let message = result.unwrap_err().message;
                assert!(message.contains("Valet"));
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn test_worker_thread_round_trip() {
        let (command_tx, command_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = spawn_background_worker(Arc::new(FailingSource), command_rx, result_tx).unwrap();

        command_tx.send(WorkerCommand::FetchCurrencies { cycle: 1 }).unwrap();
        let intent = result_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(intent, Intent::CurrenciesLoaded { cycle: 1, result: Err(_) }));

        drop(command_tx);
        handle.join().unwrap();
    }
}
