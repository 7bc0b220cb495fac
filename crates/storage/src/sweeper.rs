//! Varredura periódica de mapeamentos expirados.
//!
//! Uma task do Tokio acorda a cada `period`, captura o relógio e chama
//! `MappingStore::delete_expired`. Falhas do store são logadas e engolidas:
//! a limpeza fica para o próximo tick. O sinal de vida é um `watch`; depois
//! que ele é derrubado nenhum tick novo é agendado (um tick já pronto ainda
//! pode rodar uma última vez).

use std::time::Duration;

use sho_common::StorageError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace, warn};

use crate::entry::unix_now;
use crate::store::MappingStore;

/// Handle da varredura em background. Dropar o handle para a varredura.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Inicia a varredura como task de fundo. O primeiro tick acontece após
    /// um `period` inteiro.
    pub fn start<S: MappingStore>(store: S, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper_loop(store, period, shutdown_rx));

        info!("varredura de expiração iniciada (intervalo {period:?})");

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Derruba o sinal de vida. Chamado também no drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Para e espera a task terminar.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("varredura de expiração encerrada");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Uma passada de limpeza com o relógio atual.
pub async fn sweep_once<S: MappingStore>(store: &S) -> Result<usize, StorageError> {
    store.delete_expired(unix_now()).await
}

async fn sweeper_loop<S: MappingStore>(
    store: S,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("varredura recebeu sinal de shutdown");
                    return;
                }
            }
        }

        match sweep_once(&store).await {
            Ok(0) => trace!("nenhum mapeamento expirado"),
            Ok(removed) => debug!(removed, "mapeamentos expirados removidos"),
            Err(e) => warn!("varredura falhou, nova tentativa no próximo tick: {e}"),
        }
    }
}
