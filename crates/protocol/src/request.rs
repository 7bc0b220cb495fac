use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;
use sho_common::ProtocolError;

use crate::Form;
use crate::head::{self, Headers};

/// Método HTTP da requisição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn from_token(token: &str) -> Method {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(m) => m,
        }
    }
}

/// Versão do protocolo. Só HTTP/1.x é aceito.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// Uma requisição HTTP/1.x com corpo delimitado por Content-Length.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub version: Version,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    /// GET simples, usado pelo cliente.
    pub fn get(path: &str, host: &str) -> Request {
        Request {
            method: Method::Get,
            path: path.to_string(),
            version: Version::Http11,
            headers: vec![("Host".into(), host.to_string())],
            body: Bytes::new(),
        }
    }

    /// POST com corpo `application/x-www-form-urlencoded`.
    pub fn post_form(path: &str, host: &str, form: &Form) -> Request {
        Request {
            method: Method::Post,
            path: path.to_string(),
            version: Version::Http11,
            headers: vec![
                ("Host".into(), host.to_string()),
                (
                    "Content-Type".into(),
                    "application/x-www-form-urlencoded".into(),
                ),
            ],
            body: Bytes::from(form.encode_urlencoded()),
        }
    }

    /// Verifica se uma requisição completa está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completa, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        head::check_message(src)
    }

    /// Faz o parse de uma requisição completa a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Request, ProtocolError> {
        let line = head::get_line(src)?;
        let line = std::str::from_utf8(line)
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;

        let mut parts = line.split(' ');
        let (Some(method), Some(path), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ProtocolError::InvalidRequestLine(line.to_string()));
        };

        let version = match version {
            "HTTP/1.1" => Version::Http11,
            "HTTP/1.0" => Version::Http10,
            _ => return Err(ProtocolError::InvalidRequestLine(line.to_string())),
        };
        if method.is_empty() || !path.starts_with('/') {
            return Err(ProtocolError::InvalidRequestLine(line.to_string()));
        }

        let headers = head::parse_headers(src)?;
        let body = head::parse_body(src, &headers)?;

        Ok(Request {
            method: Method::from_token(method),
            path: path.to_string(),
            version,
            headers,
            body,
        })
    }

    /// Encoda a requisição no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.path.as_bytes());
        match self.version {
            Version::Http11 => dst.put(&b" HTTP/1.1\r\n"[..]),
            Version::Http10 => dst.put(&b" HTTP/1.0\r\n"[..]),
        }
        let with_length = !self.body.is_empty() || self.method == Method::Post;
        head::encode_tail(dst, &self.headers, &self.body, with_length);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        head::find_header(&self.headers, name)
    }

    /// Indica se a conexão deve continuar aberta depois da resposta.
    pub fn keep_alive(&self) -> bool {
        match (self.version, self.header("connection")) {
            (_, Some(v)) if v.eq_ignore_ascii_case("close") => false,
            (Version::Http10, Some(v)) => v.eq_ignore_ascii_case("keep-alive"),
            (Version::Http10, None) => false,
            (Version::Http11, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Request, ProtocolError> {
        let mut cursor = Cursor::new(data);
        Request::check(&mut cursor)?;
        cursor.set_position(0);
        Request::parse(&mut cursor)
    }

    #[test]
    fn parse_simple_get() {
        let req = parse(b"GET /abc123 HTTP/1.1\r\nHost: sho.com\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/abc123");
        assert_eq!(req.version, Version::Http11);
        assert_eq!(req.header("host"), Some("sho.com"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn parse_post_with_body() {
        let req = parse(
            b"POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 15\r\n\r\nURL=example.org",
        )
        .unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body, Bytes::from("URL=example.org"));
    }

    #[test]
    fn incomplete_head() {
        let data = b"GET / HTTP/1.1\r\nHost: x\r\n";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Request::check(&mut cursor),
            Err(ProtocolError::Incomplete)
        ));
    }

    #[test]
    fn incomplete_body() {
        let data = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nURL=";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Request::check(&mut cursor),
            Err(ProtocolError::Incomplete)
        ));
    }

    #[test]
    fn check_stops_at_message_boundary() {
        let data = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let mut cursor = Cursor::new(&data[..]);
        Request::check(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 19);
    }

    #[test]
    fn invalid_request_line() {
        assert!(matches!(
            parse(b"GET\r\n\r\n"),
            Err(ProtocolError::InvalidRequestLine(_))
        ));
        assert!(matches!(
            parse(b"GET / SPDY/3\r\n\r\n"),
            Err(ProtocolError::InvalidRequestLine(_))
        ));
        assert!(matches!(
            parse(b"GET abc HTTP/1.1\r\n\r\n"),
            Err(ProtocolError::InvalidRequestLine(_))
        ));
    }

    #[test]
    fn invalid_header() {
        assert!(matches!(
            parse(b"GET / HTTP/1.1\r\nsem-dois-pontos\r\n\r\n"),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }

    #[test]
    fn other_methods_are_kept() {
        let req = parse(b"DELETE /x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Other("DELETE".into()));
    }

    #[test]
    fn keep_alive_rules() {
        let req = parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.keep_alive());
        let req = parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!req.keep_alive());
        let req = parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!req.keep_alive());
        let req = parse(b"GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n").unwrap();
        assert!(req.keep_alive());
    }

    #[test]
    fn encode_post_form_sets_length() {
        let mut form = Form::new();
        form.push("URL", "example.org");
        let req = Request::post_form("/", "localhost:8000", &form);

        let mut buf = BytesMut::new();
        req.encode(&mut buf);
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.starts_with("POST / HTTP/1.1\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.ends_with("\r\n\r\nURL=example.org"));

        let parsed = parse(&buf).unwrap();
        assert_eq!(parsed.body, req.body);
    }
}
