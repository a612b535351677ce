use crate::{media_types, Session, SessionStore};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
pub use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Sentinel status for exchanges that never produced a response.
///
/// Distinct from every real HTTP status so that callers can always tell a transport
/// failure from a server answer.
pub const STATUS_UNREACHABLE: u16 = 0;
/// The single status that indicates success.
pub const STATUS_OK: u16 = 200;
/// The caller is not authenticated.
pub const STATUS_UNAUTHENTICATED: u16 = 401;
/// The session has expired and a new login is required.
pub const STATUS_SESSION_EXPIRED: u16 = 440;

/// An error raised while constructing an [ApiClient].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to initialize the HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The uniform completion of one exchange with the server.
///
/// Every call resolves to an outcome, even on transport failure (see
/// [STATUS_UNREACHABLE]); callers never hang waiting for a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Outcome {
    fn synthetic(status: u16) -> Self {
        Outcome {
            status,
            content_type: None,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Deserializes the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// The body of a request.
#[derive(Clone, Debug)]
pub enum RequestBody {
    Empty,
    /// Sent verbatim.
    Text(String),
    /// Serialized to JSON text before transmission.
    Json(Value),
}

/// Whether an exchange may be attempted without a session credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Auth {
    Required,
    NotRequired,
}

/// The gateway to a remote triple-store server.
///
/// Translates every logical operation into exactly one HTTP exchange and delivers a
/// uniform [Outcome] regardless of what happened at the transport level. The client
/// carries the page's [Session] and attaches its credential to every exchange.
pub struct ApiClient {
    endpoint: String,
    http: reqwest::Client,
    session: Session,
    store: Option<Box<dyn SessionStore + Send + Sync>>,
}

impl ApiClient {
    /// Creates a client for the given endpoint base, e.g. `https://host:3443/api/v1`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Ok(ApiClient {
            endpoint: endpoint.into(),
            http: reqwest::Client::builder().build()?,
            session: Session::anonymous(),
            store: None,
        })
    }

    /// Attaches a persistent session store and restores any session it holds.
    pub fn with_store(mut self, store: Box<dyn SessionStore + Send + Sync>) -> Self {
        self.session = Session::restore(store.as_ref());
        self.store = Some(store);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Performs one authenticated exchange with the server.
    ///
    /// `content_type = None` selects the default command content type for requests
    /// that carry a body. Without a session credential the call short-circuits to a
    /// synthetic 401 before touching the network.
    pub async fn call(
        &self,
        path: &str,
        method: Method,
        content_type: Option<&str>,
        body: RequestBody,
    ) -> Outcome {
        self.execute(
            path,
            method,
            content_type,
            body,
            media_types::ACCEPT_DEFAULT,
            Auth::Required,
        )
        .await
    }

    /// Executes a SPARQL query against a database.
    ///
    /// The request advertises both response encodings; the server chooses which one
    /// it returns and the result decoder handles either.
    pub async fn query(&self, database: &str, sparql: &str) -> Outcome {
        self.execute(
            &format!("/databases/{}/sparql", encode(database)),
            Method::POST,
            Some(media_types::SPARQL_QUERY),
            RequestBody::Text(sparql.to_owned()),
            media_types::ACCEPT_QUERY,
            Auth::Required,
        )
        .await
    }

    /// Posts one line of the text command language to the command channel.
    pub async fn command(&self, command: &str) -> Outcome {
        self.execute(
            "",
            Method::POST,
            Some(media_types::COMMAND),
            RequestBody::Text(command.to_owned()),
            media_types::ACCEPT_DEFAULT,
            Auth::Required,
        )
        .await
    }

    /// Authenticates against the server.
    ///
    /// This exchange is the sole authority on session validity: on success the
    /// client adopts the submitted identity together with a token derived from the
    /// credentials; on any failure all session state is cleared, even if a session
    /// existed before the attempt.
    pub async fn login(&mut self, principal: &str, password: &str) -> Outcome {
        let outcome = self
            .execute(
                &format!("/me/login?login={}", encode(principal)),
                Method::POST,
                Some(media_types::TEXT_PLAIN),
                RequestBody::Text(password.to_owned()),
                media_types::ACCEPT_DEFAULT,
                Auth::NotRequired,
            )
            .await;
        if outcome.is_success() {
            let credential = BASE64.encode(format!("{principal}:{password}"));
            self.session = Session::established(principal, credential);
        } else {
            self.session = Session::anonymous();
        }
        self.write_through();
        outcome
    }

    /// Drops the session, locally and in the persistent store.
    pub fn logout(&mut self) {
        self.session = Session::anonymous();
        self.write_through();
    }

    fn write_through(&mut self) {
        if let Some(store) = &mut self.store {
            self.session.persist(store.as_mut());
        }
    }

    async fn execute(
        &self,
        path: &str,
        method: Method,
        content_type: Option<&str>,
        body: RequestBody,
        accept: &str,
        auth: Auth,
    ) -> Outcome {
        if auth == Auth::Required && !self.session.is_logged_in() {
            // Fail fast: the server would reject the exchange anyway.
            debug!(path, "short-circuiting unauthenticated call");
            return Outcome::synthetic(STATUS_UNAUTHENTICATED);
        }

        let url = format!("{}{path}", self.endpoint);
        let mut request = self.http.request(method.clone(), &url).header(ACCEPT, accept);
        if let Some(credential) = self.session.credential() {
            request = request.header(AUTHORIZATION, format!("Basic {credential}"));
        }
        request = match body {
            RequestBody::Empty => match content_type {
                Some(content_type) => request.header(CONTENT_TYPE, content_type),
                None => request,
            },
            RequestBody::Text(text) => request
                .header(CONTENT_TYPE, content_type.unwrap_or(media_types::COMMAND))
                .body(text),
            RequestBody::Json(value) => request
                .header(CONTENT_TYPE, content_type.unwrap_or(media_types::JSON))
                .body(value.to_string()),
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(ToOwned::to_owned);
                match response.text().await {
                    Ok(text) => {
                        debug!(%method, path, status, "exchange completed");
                        Outcome {
                            status,
                            content_type,
                            body: text,
                        }
                    }
                    Err(error) => {
                        debug!(%method, path, %error, "response body lost in transit");
                        Outcome::synthetic(STATUS_UNREACHABLE)
                    }
                }
            }
            Err(error) => {
                debug!(%method, path, %error, "transport failure");
                Outcome::synthetic(STATUS_UNREACHABLE)
            }
        }
    }
}

/// Percent-encodes a value for use in a path segment or query parameter.
pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn unauthenticated_call_short_circuits_to_401() {
        // The endpoint is not routable; reaching the network would yield the
        // unreachable sentinel instead of a clean 401.
        let client = ApiClient::new("http://192.0.2.1/api/v1").unwrap();
        let outcome = client
            .call("/databases", Method::GET, None, RequestBody::Empty)
            .await;
        assert_eq!(outcome.status, STATUS_UNAUTHENTICATED);
        assert_eq!(outcome.body, "");
    }

    #[tokio::test]
    async fn transport_failure_resolves_with_the_sentinel_status() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        // Nothing listens on the discard port.
        let client = ApiClient::new("http://127.0.0.1:9/api/v1")
            .unwrap()
            .with_store(Box::new(store));
        let outcome = client
            .call("/databases", Method::GET, None, RequestBody::Empty)
            .await;
        assert_eq!(outcome.status, STATUS_UNREACHABLE);
    }

    #[tokio::test]
    async fn failed_login_clears_an_existing_session() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        let mut client = ApiClient::new("http://127.0.0.1:9/api/v1")
            .unwrap()
            .with_store(Box::new(store));
        assert!(client.is_logged_in());

        let outcome = client.login("admin", "wrong").await;
        assert!(!outcome.is_success());
        assert!(!client.is_logged_in());
        assert_eq!(client.session().credential(), None);
    }

    #[tokio::test]
    async fn command_requires_a_session() {
        let client = ApiClient::new("http://192.0.2.1/api/v1").unwrap();
        let outcome = client.command("ADMIN LIST USERS").await;
        assert_eq!(outcome.status, STATUS_UNAUTHENTICATED);
    }

    #[tokio::test]
    async fn command_posts_the_command_content_type() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !String::from_utf8_lossy(&request).ends_with("ADMIN LIST USERS") {
                let read = stream.read(&mut buffer).unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK",
                )
                .unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        let client = ApiClient::new(endpoint).unwrap().with_store(Box::new(store));
        let outcome = client.command("ADMIN LIST USERS").await;
        assert_eq!(outcome.status, STATUS_OK);
        assert_eq!(outcome.body, "OK");
        assert_eq!(outcome.content_type.as_deref(), Some("text/plain"));

        let request = server.join().unwrap();
        let headers = request.to_lowercase();
        assert!(request.starts_with("POST /api/v1 HTTP/1.1"));
        assert!(headers.contains("content-type: application/x-graphdesk-command"));
        assert!(headers.contains("authorization: basic token"));
        assert!(request.ends_with("ADMIN LIST USERS"));
    }

    #[test]
    fn store_attachment_restores_the_session() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        let client = ApiClient::new("http://localhost/api/v1")
            .unwrap()
            .with_store(Box::new(store));
        assert_eq!(client.session().principal(), Some("admin"));
    }

    #[test]
    fn logout_erases_the_persisted_session() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        let mut client = ApiClient::new("http://localhost/api/v1")
            .unwrap()
            .with_store(Box::new(store));
        client.logout();
        assert!(!client.is_logged_in());
    }

    #[test]
    fn encode_escapes_reserved_characters() {
        assert_eq!(encode("my db/1"), "my%20db%2F1");
        assert_eq!(encode("plain"), "plain");
    }
}
