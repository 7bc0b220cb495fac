use sho_common::{CommandError, LANDING_PATH, ROOT_KEY};

use crate::{Form, Method, Request, percent_decode};

/// Pedido de criação de um mapeamento, já validado.
///
/// Regras de default:
/// - `URL` é obrigatório como campo, mas pode vir vazio (vira `InvalidInput`
///   no coordenador, não erro de protocolo).
/// - `SEO` ausente ou vazio significa chave gerada; quando presente recebe o
///   prefixo `/`, pois é assim que o caminho chega num GET.
/// - `TTL` ausente, vazio ou `0` significa "nunca expira".
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub destination: String,
    pub custom_key: Option<String>,
    pub ttl: u64,
}

impl CreateRequest {
    pub fn new(destination: impl Into<String>, custom_key: Option<&str>, ttl: u64) -> Self {
        let custom_key = custom_key
            .filter(|k| !k.is_empty())
            .map(|k| format!("{ROOT_KEY}{k}"));

        Self {
            destination: destination.into(),
            custom_key,
            ttl,
        }
    }

    pub fn from_form(form: &Form) -> Result<Self, CommandError> {
        let url = form
            .get("URL")
            .ok_or_else(|| CommandError::MissingField("URL".into()))?;

        let seo = form.get("SEO");
        // Destino e chave acabam em header (Location) e em caminho
        for (field, value) in [("URL", Some(url)), ("SEO", seo)] {
            if value.is_some_and(|v| v.chars().any(|c| c.is_ascii_control())) {
                return Err(CommandError::ControlCharacter(field.into()));
            }
        }

        let ttl = match form.get("TTL").map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| CommandError::InvalidTtl(raw.to_string()))?,
        };

        Ok(Self::new(url, seo, ttl))
    }
}

/// O que o servidor deve fazer com uma requisição.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Página inicial com o formulário.
    Landing,
    /// Resolver uma chave curta para redirecionamento.
    Resolve(String),
    Create(CreateRequest),
    Unsupported(String),
}

impl Command {
    /// Faz o roteamento de uma Request em um Command.
    pub fn from_request(request: Request) -> Result<Command, CommandError> {
        match request.method {
            Method::Get => {
                let path = request.path.split('?').next().unwrap_or_default();
                if path == LANDING_PATH {
                    return Ok(Command::Landing);
                }
                Ok(Command::Resolve(percent_decode(path)?))
            }
            Method::Post => {
                let form = Form::from_body(request.header("content-type"), &request.body)?;
                Ok(Command::Create(CreateRequest::from_form(&form)?))
            }
            Method::Other(name) => Ok(Command::Unsupported(name)),
        }
    }
}
