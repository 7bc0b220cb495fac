use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;
use sho_common::ProtocolError;

use crate::head::{self, Headers};

/// Status HTTP usados pelo serviço.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    MovedPermanently,
    SeeOther,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::MovedPermanently => 301,
            Status::SeeOther => 303,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::PayloadTooLarge => 413,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::MovedPermanently => "Moved Permanently",
            Status::SeeOther => "See Other",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::PayloadTooLarge => "Payload Too Large",
            Status::InternalServerError => "Internal Server Error",
        }
    }

    pub fn from_code(code: u16) -> Option<Status> {
        let status = match code {
            200 => Status::Ok,
            301 => Status::MovedPermanently,
            303 => Status::SeeOther,
            400 => Status::BadRequest,
            404 => Status::NotFound,
            405 => Status::MethodNotAllowed,
            413 => Status::PayloadTooLarge,
            500 => Status::InternalServerError,
            _ => return None,
        };
        Some(status)
    }
}

/// Resposta HTTP/1.1. O Content-Length é sempre calculado no `encode`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: Status) -> Response {
        Response {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// 301 para o destino de um mapeamento.
    pub fn redirect(location: &str) -> Response {
        Response::new(Status::MovedPermanently).with_header("Location", location)
    }

    pub fn html(status: Status, body: impl Into<String>) -> Response {
        Response {
            status,
            headers: vec![("Content-Type".into(), "text/html; charset=utf-8".into())],
            body: Bytes::from(body.into()),
        }
    }

    /// 303 com a página de resultado de uma submissão.
    pub fn see_other(body: impl Into<String>) -> Response {
        Response::html(Status::SeeOther, body)
    }

    pub fn not_found() -> Response {
        Response::new(Status::NotFound)
    }

    pub fn bad_request(message: &str) -> Response {
        Response::text(Status::BadRequest, message)
    }

    pub fn method_not_allowed() -> Response {
        Response::new(Status::MethodNotAllowed).with_header("Allow", "GET, POST")
    }

    pub fn payload_too_large() -> Response {
        Response::new(Status::PayloadTooLarge).with_header("Connection", "close")
    }

    pub fn internal_error() -> Response {
        Response::text(Status::InternalServerError, "internal error")
    }

    fn text(status: Status, message: &str) -> Response {
        Response {
            status,
            headers: vec![("Content-Type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::from(message.to_string()),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Response {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        head::find_header(&self.headers, name)
    }

    /// Encoda a resposta no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put(&b"HTTP/1.1 "[..]);
        dst.put(self.status.code().to_string().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.status.reason().as_bytes());
        dst.put(&b"\r\n"[..]);
        head::encode_tail(dst, &self.headers, &self.body, true);
    }

    /// Verifica se uma resposta completa está no buffer (lado cliente).
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        head::check_message(src)
    }

    /// Faz o parse de uma resposta completa. Chamar apenas após `check()`.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Response, ProtocolError> {
        let line = head::get_line(src)?;
        let line = std::str::from_utf8(line)
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;

        let mut parts = line.splitn(3, ' ');
        let status = match (parts.next(), parts.next()) {
            (Some(version), Some(code)) if version.starts_with("HTTP/1.") => code
                .parse::<u16>()
                .ok()
                .and_then(Status::from_code)
                .ok_or_else(|| ProtocolError::InvalidStatusLine(line.to_string()))?,
            _ => return Err(ProtocolError::InvalidStatusLine(line.to_string())),
        };

        let headers = head::parse_headers(src)?;
        let body = head::parse_body(src, &headers)?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
