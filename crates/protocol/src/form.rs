use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sho_common::CommandError;

/// Tudo fora dos não-reservados da RFC 3986 é escapado.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Campos de um formulário HTML, na ordem em que chegaram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Form {
        Form::default()
    }

    pub fn push(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_string(), value.to_string()));
    }

    /// Primeiro valor do campo `name`, se presente.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodifica o corpo de um POST de acordo com o Content-Type.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Form, CommandError> {
        let content_type = content_type.unwrap_or("application/x-www-form-urlencoded");
        let mut params = content_type.split(';').map(str::trim);
        let mime = params.next().unwrap_or_default().to_ascii_lowercase();

        match mime.as_str() {
            "application/x-www-form-urlencoded" => Form::from_urlencoded(body),
            "multipart/form-data" => {
                let boundary = params
                    .filter_map(|p| p.split_once('='))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
                    .map(|(_, v)| v.trim().trim_matches('"'))
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| CommandError::MalformedForm("boundary ausente".into()))?;
                Form::from_multipart(body, boundary)
            }
            _ => Err(CommandError::UnsupportedContentType(content_type.to_string())),
        }
    }

    /// `a=1&b=dois+tres`
    pub fn from_urlencoded(body: &[u8]) -> Result<Form, CommandError> {
        let text = std::str::from_utf8(body)
            .map_err(|_| CommandError::MalformedForm("corpo não é UTF-8".into()))?;
        check_escapes(text)?;

        let fields = form_urlencoded::parse(body)
            .map(|(n, v)| (n.into_owned(), v.into_owned()))
            .collect();
        Ok(Form { fields })
    }

    /// Corpo `multipart/form-data` (RFC 7578). Partes sem `name` são ignoradas.
    pub fn from_multipart(body: &[u8], boundary: &str) -> Result<Form, CommandError> {
        let delimiter = format!("--{boundary}");
        let inner = format!("\r\n{delimiter}");

        let first = find(body, delimiter.as_bytes())
            .ok_or_else(|| CommandError::MalformedForm("delimitador não encontrado".into()))?;
        let mut rest = &body[first + delimiter.len()..];

        let mut form = Form::new();
        loop {
            // Delimitador de fechamento
            if rest.starts_with(b"--") {
                return Ok(form);
            }
            rest = rest
                .strip_prefix(b"\r\n")
                .ok_or_else(|| CommandError::MalformedForm("parte sem CRLF".into()))?;

            let end = find(rest, inner.as_bytes())
                .ok_or_else(|| CommandError::MalformedForm("parte não terminada".into()))?;
            if let Some((name, value)) = parse_part(&rest[..end])? {
                form.fields.push((name, value));
            }
            rest = &rest[end + inner.len()..];
        }
    }

    pub fn encode_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.fields)
            .finish()
    }
}

fn parse_part(part: &[u8]) -> Result<Option<(String, String)>, CommandError> {
    let split = find(part, b"\r\n\r\n")
        .ok_or_else(|| CommandError::MalformedForm("parte sem headers".into()))?;
    let headers = std::str::from_utf8(&part[..split])
        .map_err(|_| CommandError::MalformedForm("headers da parte não são UTF-8".into()))?;
    let content = &part[split + 4..];

    let name = headers
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-disposition"))
        .and_then(|(_, v)| disposition_name(v));

    let Some(name) = name else {
        return Ok(None);
    };
    let value = String::from_utf8(content.to_vec())
        .map_err(|_| CommandError::MalformedForm(format!("campo '{name}' não é UTF-8")))?;
    Ok(Some((name, value)))
}

/// Extrai `name` de `form-data; name="URL"`.
fn disposition_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim() == "name")
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decodifica `%XX` de um caminho. `+` fica como está.
pub fn percent_decode(input: &str) -> Result<String, CommandError> {
    check_escapes(input)?;
    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| CommandError::MalformedForm(format!("'{input}' não é UTF-8")))
}

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// O decoder da percent-encoding deixa `%` solto passar literal; aqui todo
/// `%` precisa vir seguido de dois dígitos hexadecimais.
fn check_escapes(input: &str) -> Result<(), CommandError> {
    let bytes = input.as_bytes();
    let malformed = bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit))
    });
    if malformed {
        return Err(CommandError::MalformedForm(format!("escape inválido em '{input}'")));
    }
    Ok(())
}
