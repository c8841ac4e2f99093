use std::collections::HashMap;

use anyhow::{Context, Result, bail, ensure};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use url::Url;

pub enum HttpMethod {
    GET,
    POST,
}

impl HttpMethod {
    fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
        }
    }
}

pub struct HttpClient {}

impl HttpClient {
    /// Sends one HTTP/1.1 request with `Connection: close` and reads the
    /// whole response. `https` URLs go through native-tls.
    pub async fn fetch(
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid url {}", url))?;

        let host = parsed.host_str().context("Url has no host")?;
        let port = parsed
            .port_or_known_default()
            .context("Url has no known port")?;
        let full_path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };
        let host_header = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let mut req = format!(
            "{} {} HTTP/1.1\r\n\
            Host: {}\r\n\
            Connection: close\r\n",
            method.as_str(),
            full_path,
            host_header
        );
        for (name, value) in headers {
            ensure!(
                !name.is_empty() && !name.contains([':', '\r', '\n']),
                "Invalid header name {:?}",
                name
            );
            ensure!(
                !value.contains(['\r', '\n']),
                "Invalid header value for {}",
                name
            );
            req.push_str(&format!("{}: {}\r\n", name, value));
        }
        let body = body.unwrap_or_default();
        if matches!(method, HttpMethod::POST) || !body.is_empty() {
            req.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        req.push_str("\r\n");
        req.push_str(body);

        let conn = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let raw = match parsed.scheme() {
            "https" => {
                let tls_connector = native_tls::TlsConnector::new().context("error init tls")?;
                let connector = tokio_native_tls::TlsConnector::from(tls_connector);
                let stream = connector
                    .connect(host, conn)
                    .await
                    .context("TLS Handshake failed")?;
                Self::exchange(stream, &req).await?
            }
            "http" => Self::exchange(conn, &req).await?,
            other => bail!("Unsupported scheme {}", other),
        };

        let res = String::from_utf8_lossy(&raw);
        Response::new(&res)
    }

    async fn exchange<S>(mut stream: S, req: &str) -> Result<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream
            .write_all(req.as_bytes())
            .await
            .context("Failed to write request")?;
        stream.flush().await.context("Failed to flush")?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .context("Failed to read response")?;
        Ok(response)
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl Response {
    pub fn new(response: &str) -> Result<Self> {
        let (head, body) = match response.split_once("\r\n\r\n") {
            Some((head, body)) => (head, Some(body)),
            None => (response, None),
        };

        // Status line
        let mut head_line = head.lines();
        let first: &str = head_line.next().context("Empty Response")?;
        let mut response_parts = first.split_whitespace();
        let _http = response_parts.next().context("Missing Http")?;
        let status = response_parts.next().context("No Status Code")?;

        // Headers
        let mut headers = HashMap::new();
        for line in head_line {
            if let Some((k, v)) = line.split_once(":") {
                headers.insert(k.trim().to_lowercase(), v.trim().to_string());
            }
        }

        let chunked = headers
            .get("transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
        let body = match body {
            Some(b) if chunked => Some(decode_chunked(b)?),
            Some(b) if b.is_empty() => None,
            Some(b) => Some(b.to_string()),
            None => None,
        };

        Ok(Response {
            status: status.parse::<u16>()?,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn decode_chunked(mut rest: &str) -> Result<String> {
    let mut out = String::new();
    loop {
        let (size_line, after) = rest.split_once("\r\n").context("Truncated chunk size")?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("Invalid chunk size {:?}", size_hex))?;
        if size == 0 {
            return Ok(out);
        }
        let chunk = after.get(..size).context("Truncated chunk")?;
        out.push_str(chunk);
        rest = after
            .get(size..)
            .and_then(|r| r.strip_prefix("\r\n"))
            .context("Missing chunk terminator")?;
    }
}
