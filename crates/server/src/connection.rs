use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use sho_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, ProtocolError};
use sho_protocol::{Request, Response};

/// Conexão HTTP/1.1 com um cliente. Guarda os bytes de requisições ainda
/// incompletas (ou já recebidas em pipeline) entre uma leitura e outra.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    inbound: BytesMut,
    outbound: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            inbound: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            outbound: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Próxima requisição completa. `None` quando o cliente fecha entre duas
    /// requisições; fechar no meio de uma é `ConnectionReset`.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        loop {
            self.skip_blank_lines();
            if let Some(request) = self.take_request()? {
                return Ok(Some(request));
            }

            if self.stream.read_buf(&mut self.inbound).await? == 0 {
                self.skip_blank_lines();
                if self.inbound.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    pub async fn write_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        self.outbound.clear();
        response.encode(&mut self.outbound);
        self.stream.write_all(&self.outbound).await?;
        self.stream.flush().await?;
        Ok(())
    }

    // CRLF solto antes da request line é tolerado (RFC 9112, seção 2.2)
    fn skip_blank_lines(&mut self) {
        while self.inbound.starts_with(b"\r\n") {
            self.inbound.advance(2);
        }
    }

    fn take_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        let mut cursor = Cursor::new(&self.inbound[..]);
        let len = match Request::check(&mut cursor) {
            Ok(()) => cursor.position() as usize,
            Err(ProtocolError::Incomplete) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        cursor.set_position(0);
        let request = Request::parse(&mut cursor)?;
        self.inbound.advance(len);
        Ok(Some(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sho_protocol::Method;
    use tokio::net::TcpListener;

    async fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (Connection::new(server), client)
    }

    #[tokio::test]
    async fn reads_pipelined_requests_with_stray_crlf() {
        let (mut conn, mut client) = pair().await;
        client
            .write_all(b"\r\nGET /a HTTP/1.1\r\n\r\n\r\nGET /b HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        drop(client);

        let first = conn.read_request().await.unwrap().unwrap();
        assert_eq!(first.method, Method::Get);
        assert_eq!(first.path, "/a");
        let second = conn.read_request().await.unwrap().unwrap();
        assert_eq!(second.path, "/b");
        assert!(conn.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn request_split_across_writes() {
        let (mut conn, mut client) = pair().await;
        let reader = tokio::spawn(async move { conn.read_request().await });

        client.write_all(b"POST / HTTP/1.1\r\nContent-Le").await.unwrap();
        client.flush().await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"ngth: 5\r\n\r\nURL=x").await.unwrap();

        let request = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(&request.body[..], b"URL=x");
    }

    #[tokio::test]
    async fn eof_mid_request_is_reset() {
        let (mut conn, mut client) = pair().await;
        client.write_all(b"GET /a HTTP/1.1\r\nHo").await.unwrap();
        drop(client);

        assert!(matches!(
            conn.read_request().await,
            Err(ConnectionError::ConnectionReset)
        ));
    }
}
