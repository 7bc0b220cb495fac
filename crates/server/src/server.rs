use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, error, info};

use sho_storage::MappingStore;

use crate::{Connection, Handler, handle_connection};

/// Loop de accept: uma task por conexão, no máximo `max_connections`
/// simultâneas. Retorna quando `shutdown` completa; conexões abertas são
/// avisadas e encerram entre uma requisição e outra.
pub async fn serve<S: MappingStore>(
    listener: TcpListener,
    handler: Handler<S>,
    max_connections: usize,
    shutdown: impl Future<Output = ()>,
) {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        let (socket, addr) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(v) => v,
                    Err(e) => {
                        error!("erro ao aceitar conexão: {e}");
                        continue;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        debug!("nova conexão: {addr}");
        let handler = handler.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, handler, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            debug!("conexão encerrada: {addr}");
            drop(permit);
        });
    }

    // Drop do sender avisa as conexões abertas
    drop(shutdown_tx);
}
