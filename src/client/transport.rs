//! Request transport seam.
//!
//! `Transport` is the only place that performs I/O. The production
//! implementation is [`HttpTransport`] over a blocking `reqwest` client;
//! tests substitute scripted transports.

use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{NetworkError, UhiError, UhiResult};

/// A JSON request/response channel to the analytics service.
///
/// Implementations must bound every call and must classify failures as
/// `Unreachable` (no answer) or `Protocol` (bad answer). They must not retry.
pub trait Transport: Send + Sync {
    /// Issues `GET {base}{path}?{query}` and returns the decoded JSON body.
    fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value, NetworkError>;

    /// Issues `POST {base}{path}` with a JSON body and returns the decoded JSON body.
    fn post(&self, path: &str, body: &Value) -> Result<Value, NetworkError>;

    /// Base address, for operator-facing messages.
    fn base_url(&self) -> &str;
}

/// HTTP transport with a fixed base address and per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: ClientConfig,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `UhiError::Internal` if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> UhiResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| UhiError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn finish(
        &self,
        path: &str,
        sent: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<Value, NetworkError> {
        let resp = sent.map_err(|e| classify(&e))?;
        let status = resp.status();
        let body = resp.text().map_err(|e| classify(&e))?;

        if !status.is_success() {
            debug!(path, status = status.as_u16(), "analytics service returned an error status");
            return Err(NetworkError::status(
                status.as_u16(),
                format!("{path} returned {status}"),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| NetworkError::protocol(format!("{path} returned a malformed body: {e}")))
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value, NetworkError> {
        let sent = self.http.get(self.config.url(path)).query(query).send();
        self.finish(path, sent)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, NetworkError> {
        let sent = self.http.post(self.config.url(path)).json(body).send();
        self.finish(path, sent)
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

fn classify(err: &reqwest::Error) -> NetworkError {
    if err.is_timeout() || err.is_connect() {
        NetworkError::unreachable(err.to_string())
    } else if let Some(status) = err.status() {
        NetworkError::status(status.as_u16(), err.to_string())
    } else if err.is_request() {
        // Failures before any response arrived (e.g. connection reset mid-send).
        NetworkError::unreachable(err.to_string())
    } else {
        NetworkError::protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use crate::error::NetworkErrorKind;

    fn read_request(stream: &mut TcpStream) -> String {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            head.push_str(&line);
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        head + &String::from_utf8(body).unwrap()
    }

    /// Serves exactly one canned response and returns the raw request it saw.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            request
        });
        (format!("http://{addr}"), handle)
    }

    fn transport(base_url: String, timeout: Duration) -> HttpTransport {
        HttpTransport::new(ClientConfig { base_url, timeout }).unwrap()
    }

    #[test]
    fn get_decodes_json_and_sends_query() {
        let (base, server) = serve_once("200 OK", r#"[{"id": 1}]"#);
        let t = transport(base, Duration::from_secs(5));

        let body = t
            .get("/api/v1/health_precautions", &[("lat", "18.5".to_string())])
            .unwrap();
        assert_eq!(body, serde_json::json!([{"id": 1}]));

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /api/v1/health_precautions?lat=18.5 "));
    }

    #[test]
    fn post_sends_json_body() {
        let (base, server) = serve_once("200 OK", r#"{"average_temperature": 36.0}"#);
        let t = transport(base, Duration::from_secs(5));

        let body = t
            .post("/api/v1/simulate_intervention", &serde_json::json!({"interventions": []}))
            .unwrap();
        assert_eq!(body["average_temperature"], 36.0);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /api/v1/simulate_intervention "));
        assert!(request.contains(r#"{"interventions":[]}"#));
    }

    #[test]
    fn non_success_status_is_protocol() {
        let (base, server) = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#);
        let t = transport(base, Duration::from_secs(5));

        let err = t.get("/api/v1/recommendations", &[]).unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Protocol);
        assert_eq!(err.status, Some(500));
        server.join().unwrap();
    }

    #[test]
    fn malformed_body_is_protocol() {
        let (base, server) = serve_once("200 OK", "<html>not json</html>");
        let t = transport(base, Duration::from_secs(5));

        let err = t.get("/api/v1/heatmap_data", &[]).unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Protocol);
        assert_eq!(err.status, None);
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_unreachable() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let t = transport(format!("http://{addr}"), Duration::from_secs(2));

        let err = t.get("/api/v1/heatmap_data", &[]).unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Unreachable);
    }

    #[test]
    fn silent_server_times_out_as_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(600));
            drop(stream);
        });

        let t = transport(format!("http://{addr}"), Duration::from_millis(150));
        let err = t.get("/api/v1/recommendations", &[]).unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Unreachable);
        server.join().unwrap();
    }
}
