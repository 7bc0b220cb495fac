use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use sho_common::{ConnectionError, ProtocolError};
use sho_protocol::{Command, Response, Status};
use sho_storage::{MappingCoordinator, MappingStore};

use crate::Connection;
use crate::html;

/// Estado compartilhado pelas conexões: coordenador + página inicial.
#[derive(Clone)]
pub struct Handler<S> {
    coordinator: MappingCoordinator<S>,
    landing_page: Arc<str>,
}

impl<S: MappingStore> Handler<S> {
    pub fn new(coordinator: MappingCoordinator<S>, landing_page: impl Into<Arc<str>>) -> Self {
        Self {
            coordinator,
            landing_page: landing_page.into(),
        }
    }

    /// Executa um comando e retorna a resposta HTTP.
    pub async fn execute(&self, cmd: Command) -> Response {
        match cmd {
            Command::Landing => Response::html(Status::Ok, self.landing_page.as_ref()),
            Command::Resolve(key) => match self.coordinator.resolve(&key).await {
                Ok(Some(destination)) => Response::redirect(&destination),
                Ok(None) => Response::not_found(),
                Err(e) => {
                    error!("falha ao resolver {key}: {e}");
                    Response::internal_error()
                }
            },
            Command::Create(request) => match self.coordinator.create_mapping(request).await {
                Ok(outcome) => Response::see_other(html::outcome_page(&outcome)),
                Err(e) => {
                    error!("falha ao criar mapeamento: {e}");
                    Response::internal_error()
                }
            },
            Command::Unsupported(method) => {
                debug!("método não suportado: {method}");
                Response::method_not_allowed()
            }
        }
    }
}

/// Loop principal de tratamento de uma conexão (keep-alive até EOF,
/// `Connection: close` ou shutdown).
pub async fn handle_connection<S: MappingStore>(
    mut conn: Connection,
    handler: Handler<S>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let result = tokio::select! {
            result = conn.read_request() => result,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let request = match result {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()), // EOF
            Err(ConnectionError::Protocol(e)) => {
                debug!("requisição inválida: {e}");
                let response = match e {
                    ProtocolError::RequestTooLarge(_) => Response::payload_too_large(),
                    e => Response::bad_request(&e.to_string()).with_header("Connection", "close"),
                };
                conn.write_response(&response).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        debug!("requisição recebida: {} {}", request.method.as_str(), request.path);
        let keep_alive = request.keep_alive();

        let response = match Command::from_request(request) {
            Ok(cmd) => handler.execute(cmd).await,
            Err(e) => Response::bad_request(&e.to_string()),
        };

        if !keep_alive {
            conn.write_response(&response.with_header("Connection", "close"))
                .await?;
            return Ok(());
        }
        conn.write_response(&response).await?;
    }
}
