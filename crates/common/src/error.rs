/// Erros de parsing do protocolo HTTP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("requisição incompleta")]
    Incomplete,
    #[error("linha de requisição inválida: {0}")]
    InvalidRequestLine(String),
    #[error("linha de status inválida: {0}")]
    InvalidStatusLine(String),
    #[error("header inválido: {0}")]
    InvalidHeader(String),
    #[error("Content-Length inválido: {0}")]
    InvalidContentLength(String),
    #[error("requisição excede tamanho máximo ({0} bytes)")]
    RequestTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros da camada de armazenamento dos mapeamentos.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("erro no banco de dados: {0}")]
    Database(String),
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Erros de validação do formulário de criação e de roteamento.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("campo obrigatório ausente: '{0}'")]
    MissingField(String),
    #[error("TTL inválido: '{0}'")]
    InvalidTtl(String),
    #[error("Content-Type não suportado: {0}")]
    UnsupportedContentType(String),
    #[error("formulário malformado: {0}")]
    MalformedForm(String),
    #[error("caractere de controle no campo '{0}'")]
    ControlCharacter(String),
}
