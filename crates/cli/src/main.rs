use bytes::BytesMut;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sho_common::{DEFAULT_HOST, DEFAULT_PORT, ROOT_KEY};
use sho_protocol::{Form, Request, Response, Status, percent_encode};

#[derive(Parser, Debug)]
#[command(name = "sho-cli", about = "Cliente de linha de comando do sho")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Cria um mapeamento para URL
    Shorten {
        url: String,
        /// Nome customizado (vira /NOME)
        #[arg(long)]
        name: Option<String>,
        /// Tempo de vida em segundos (0 = para sempre)
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },
    /// Mostra para onde uma chave redireciona
    Resolve { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = TcpStream::connect(&addr).await?;

    let request = match &args.command {
        Cmd::Shorten { url, name, ttl } => {
            let mut form = Form::new();
            form.push("URL", url);
            form.push("SEO", name.as_deref().unwrap_or_default());
            form.push("TTL", &ttl.to_string());
            Request::post_form(ROOT_KEY, &addr, &form)
        }
        Cmd::Resolve { key } => Request::get(&key_path(key), &addr),
    };

    let response = execute_request(&mut stream, &request).await?;
    println!("{}", format_response(&response));

    if response.status.code() >= 400 {
        std::process::exit(1);
    }
    Ok(())
}

async fn execute_request(stream: &mut TcpStream, request: &Request) -> anyhow::Result<Response> {
    let mut buf = BytesMut::new();
    request.encode(&mut buf);

    stream.write_all(&buf).await?;
    stream.flush().await?;

    // Ler resposta
    let mut response_buf = BytesMut::with_capacity(4096);
    loop {
        let n = stream.read_buf(&mut response_buf).await?;
        if n == 0 {
            return Err(anyhow::anyhow!("servidor fechou a conexão"));
        }

        let mut cursor = std::io::Cursor::new(&response_buf[..]);
        if Response::check(&mut cursor).is_ok() {
            cursor.set_position(0);
            return Response::parse(&mut cursor).map_err(|e| anyhow::anyhow!("parse error: {e}"));
        }
    }
}

/// "abc" e "/abc" apontam para a mesma chave. O resto vai escapado.
fn key_path(key: &str) -> String {
    let name = key.strip_prefix('/').unwrap_or(key);
    format!("/{}", percent_encode(name))
}

/// Formata a resposta do servidor para o terminal.
fn format_response(response: &Response) -> String {
    match response.status {
        Status::MovedPermanently => match response.header("location") {
            Some(location) => format!("-> {location}"),
            None => "(error) redirect sem Location".to_string(),
        },
        Status::SeeOther => page_message(&response.body)
            .unwrap_or_else(|| "(error) resposta sem mensagem".to_string()),
        Status::NotFound => "(nil)".to_string(),
        status => {
            let body = String::from_utf8_lossy(&response.body);
            if body.is_empty() {
                format!("(error) {} {}", status.code(), status.reason())
            } else {
                format!("(error) {} {}: {}", status.code(), status.reason(), body.trim())
            }
        }
    }
}

/// Extrai o texto do `<h2>` das páginas de resultado, desfazendo o escape.
fn page_message(body: &[u8]) -> Option<String> {
    let page = std::str::from_utf8(body).ok()?;
    let start = page.find("<h2>")? + "<h2>".len();
    let end = page[start..].find("</h2>")? + start;
    Some(unescape(&page[start..end]))
}

fn unescape(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
