//! Pedaços comuns a requisições e respostas HTTP/1.1: linhas, headers e corpo.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use sho_common::{MAX_REQUEST_SIZE, ProtocolError};

pub(crate) type Headers = Vec<(String, String)>;

/// Verifica se uma mensagem completa (start line + headers + corpo) está no
/// buffer. Avança o cursor até o fim da mensagem.
pub(crate) fn check_message(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
    let start = src.position() as usize;

    match check_head(src) {
        Ok(len) => {
            if len > MAX_REQUEST_SIZE {
                return Err(ProtocolError::RequestTooLarge(len));
            }
            skip(src, len)
        }
        // Cabeçalho sem fim à vista e buffer já estourado: não adianta esperar mais bytes
        Err(ProtocolError::Incomplete) if src.get_ref().len() - start > MAX_REQUEST_SIZE => Err(
            ProtocolError::RequestTooLarge(src.get_ref().len() - start),
        ),
        Err(e) => Err(e),
    }
}

/// Percorre start line e headers sem alocar. Retorna o Content-Length.
fn check_head(src: &mut Cursor<&[u8]>) -> Result<usize, ProtocolError> {
    get_line(src)?;

    let mut content_length = None;
    loop {
        let line = get_line(src)?;
        if line.is_empty() {
            return Ok(content_length.unwrap_or(0));
        }
        if let Some(value) = header_value(line, "content-length") {
            let len = parse_content_length(value)?;
            content_length = Some(merge_content_length(content_length, len)?);
        }
    }
}

/// Faz o parse dos headers até a linha vazia.
pub(crate) fn parse_headers(src: &mut Cursor<&[u8]>) -> Result<Headers, ProtocolError> {
    let mut headers = Vec::new();
    loop {
        let line = get_line(src)?;
        if line.is_empty() {
            return Ok(headers);
        }

        let line = std::str::from_utf8(line)
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::InvalidHeader(line.to_string()))?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ProtocolError::InvalidHeader(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }
}

/// Lê o corpo indicado pelo Content-Length dos headers já parseados.
pub(crate) fn parse_body(src: &mut Cursor<&[u8]>, headers: &Headers) -> Result<Bytes, ProtocolError> {
    let mut len = None;
    for (_, value) in headers.iter().filter(|(n, _)| n.eq_ignore_ascii_case("content-length")) {
        len = Some(merge_content_length(len, parse_content_length(value.as_bytes())?)?);
    }
    let len = len.unwrap_or(0);
    if src.remaining() < len {
        return Err(ProtocolError::Incomplete);
    }
    let start = src.position() as usize;
    let body = Bytes::copy_from_slice(&src.get_ref()[start..start + len]);
    src.set_position((start + len) as u64);
    Ok(body)
}

/// Content-Length repetido só é aceito se todos os valores baterem.
fn merge_content_length(seen: Option<usize>, len: usize) -> Result<usize, ProtocolError> {
    match seen {
        Some(prev) if prev != len => Err(ProtocolError::InvalidContentLength(format!(
            "valores conflitantes: {prev} e {len}"
        ))),
        _ => Ok(len),
    }
}

/// Busca case-insensitive de um header.
pub(crate) fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Encoda headers + Content-Length + corpo. Um Content-Length presente em
/// `headers` é ignorado, o valor real vem do corpo. Headers com CR ou LF no
/// nome ou no valor nunca vão para o fio.
pub(crate) fn encode_tail(dst: &mut BytesMut, headers: &Headers, body: &[u8], with_length: bool) {
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-length") || breaks_line(name) || breaks_line(value) {
            continue;
        }
        dst.put(name.as_bytes());
        dst.put(&b": "[..]);
        dst.put(value.as_bytes());
        dst.put(&b"\r\n"[..]);
    }
    if with_length {
        dst.put(&b"Content-Length: "[..]);
        dst.put(body.len().to_string().as_bytes());
        dst.put(&b"\r\n"[..]);
    }
    dst.put(&b"\r\n"[..]);
    dst.put(body);
}

fn breaks_line(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}

pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    for i in start..end.saturating_sub(1) {
        if src.get_ref()[i] == b'\r' && src.get_ref()[i + 1] == b'\n' {
            src.set_position((i + 2) as u64);
            return Ok(&src.get_ref()[start..i]);
        }
    }

    Err(ProtocolError::Incomplete)
}

fn header_value<'a>(line: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    if !line[..colon].eq_ignore_ascii_case(name.as_bytes()) {
        return None;
    }
    Some(line[colon + 1..].trim_ascii())
}

fn parse_content_length(value: &[u8]) -> Result<usize, ProtocolError> {
    let s = std::str::from_utf8(value)
        .map_err(|e| ProtocolError::InvalidContentLength(e.to_string()))?;
    s.trim()
        .parse::<usize>()
        .map_err(|_| ProtocolError::InvalidContentLength(s.to_string()))
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::Incomplete);
    }
    src.set_position(src.position() + n as u64);
    Ok(())
}
