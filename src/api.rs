// HTTP transport for crash reports: a small blocking client that posts the
// encoded multipart body to the collection server and classifies the reply.
// Every submission walks the same forward-only sequence of states; a failing
// step ends the submission with the state it could not reach.

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::blocking::{Body, Client, Request, Response};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Url;

use crate::config::SenderConfig;
use crate::error::{SubmitState, TransportError};
use crate::multipart;

/// Default port used when the host has none.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Size of each read while draining the response body.
const READ_CHUNK_SIZE: usize = 4096;

/// Something that can deliver an encoded report body.
pub trait Transport {
    fn submit(&self, host: &str, path: &str, body: Vec<u8>) -> Result<(), TransportError>;
}

/// Transport backed by a `reqwest` blocking client. A fresh client (session)
/// is opened for each submission and dropped with it.
#[derive(Clone, Debug)]
pub struct CrashReportClient {
    user_agent: String,
}

impl CrashReportClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        CrashReportClient {
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &SenderConfig) -> Self {
        Self::new(config.user_agent.clone())
    }
}

impl Transport for CrashReportClient {
    fn submit(&self, host: &str, path: &str, body: Vec<u8>) -> Result<(), TransportError> {
        info!("Attempting to send crash report to {}", host);
        let mut submission = Submission::new(host, path);
        let result = submission.run(&self.user_agent, body);
        match &result {
            Ok(()) => submission.advance(SubmitState::Succeeded),
            Err(err) => submission.fail(err),
        }
        result
    }
}

/// Reader handed to the HTTP stack; counts the bytes it gives out so a short
/// write can be detected once the request is done.
struct CountingReader {
    inner: Cursor<Vec<u8>>,
    consumed: Arc<AtomicU64>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

/// One pass through the submission state machine.
struct Submission<'a> {
    host: &'a str,
    path: &'a str,
    state: SubmitState,
}

impl<'a> Submission<'a> {
    fn new(host: &'a str, path: &'a str) -> Self {
        Submission {
            host,
            path,
            state: SubmitState::Idle,
        }
    }

    fn advance(&mut self, next: SubmitState) {
        debug_assert!(next > self.state, "submission state must move forward");
        debug!("Submission {} -> {}", self.state, next);
        self.state = next;
    }

    fn run(&mut self, user_agent: &str, body: Vec<u8>) -> Result<(), TransportError> {
        let client = self.open_session(user_agent)?;
        let target = self.connect()?;
        let request = self.create_request(&client, target)?;
        let (request, consumed, expected) = self.set_headers(request, body);
        let response = self.send_body(&client, request, &consumed, expected)?;
        let (status, response_body) = self.receive_response(response);

        if !(200..300).contains(&status) {
            return Err(TransportError::Rejected {
                status,
                body: response_body,
            });
        }
        info!("Crash report sent successfully (HTTP {})", status);
        Ok(())
    }

    fn fail(&mut self, err: &TransportError) {
        warn!("Crash report submission failed after {}: {}", self.state, err);
        self.state = SubmitState::Failed;
    }

    fn open_session(&mut self, user_agent: &str) -> Result<Client, TransportError> {
        // Direct HTTP/1.1 connection: proxies from the environment are ignored
        // and redirects are returned as-is, so a 3xx is a rejection.
        let client = Client::builder()
            .user_agent(user_agent)
            .http1_only()
            .no_proxy()
            .redirect(Policy::none())
            .build()
            .map_err(|e| TransportError::step(SubmitState::SessionOpened, e.to_string()))?;
        self.advance(SubmitState::SessionOpened);
        Ok(client)
    }

    /// Resolve the server address. The TCP connection itself is opened by
    /// the client when the request is sent; failures there are reported
    /// against this step too.
    fn connect(&mut self) -> Result<Url, TransportError> {
        debug!("Connecting to server: {}", self.host);
        let target = Url::parse(&format!("http://{}{}", self.host, self.path)).map_err(|e| {
            TransportError::step(
                SubmitState::Connected,
                format!("invalid server address {}: {}", self.host, e),
            )
        })?;
        let addrs = target
            .socket_addrs(|| Some(DEFAULT_HTTP_PORT))
            .map_err(|e| {
                TransportError::step(
                    SubmitState::Connected,
                    format!("failed to resolve {}: {}", self.host, e),
                )
            })?;
        if addrs.is_empty() {
            return Err(TransportError::step(
                SubmitState::Connected,
                format!("no address found for {}", self.host),
            ));
        }
        self.advance(SubmitState::Connected);
        Ok(target)
    }

    fn create_request(&mut self, client: &Client, target: Url) -> Result<Request, TransportError> {
        debug!("Creating HTTP POST request to: {}", self.path);
        let request = client
            .post(target)
            .build()
            .map_err(|e| TransportError::step(SubmitState::RequestCreated, e.to_string()))?;
        self.advance(SubmitState::RequestCreated);
        Ok(request)
    }

    fn set_headers(&mut self, mut request: Request, body: Vec<u8>) -> (Request, Arc<AtomicU64>, u64) {
        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(multipart::CONTENT_TYPE));
        headers.insert(
            HeaderName::from_static("content-transfer-encoding"),
            HeaderValue::from_static("binary"),
        );

        // The sized body declares Content-Length before anything is written.
        let expected = body.len() as u64;
        let consumed = Arc::new(AtomicU64::new(0));
        let reader = CountingReader {
            inner: Cursor::new(body),
            consumed: Arc::clone(&consumed),
        };
        *request.body_mut() = Some(Body::sized(reader, expected));
        debug!("Total upload size: {} bytes", expected);

        self.advance(SubmitState::HeadersSet);
        (request, consumed, expected)
    }

    fn send_body(
        &mut self,
        client: &Client,
        request: Request,
        consumed: &AtomicU64,
        expected: u64,
    ) -> Result<Response, TransportError> {
        debug!("Uploading crash report data");
        let response = client.execute(request).map_err(|e| {
            if e.is_connect() {
                TransportError::step(
                    SubmitState::Connected,
                    format!("failed to connect to server {}: {}", self.host, e),
                )
            } else {
                TransportError::step(SubmitState::BodySent, e.to_string())
            }
        })?;

        let written = consumed.load(Ordering::SeqCst);
        if written != expected {
            return Err(TransportError::step(
                SubmitState::BodySent,
                format!("short write: {} of {} bytes accepted", written, expected),
            ));
        }
        self.advance(SubmitState::BodySent);
        Ok(response)
    }

    /// Status code plus whatever body the server sent, lossily decoded.
    fn receive_response(&mut self, mut response: Response) -> (u16, String) {
        let status = response.status().as_u16();
        debug!("Server responded with status: {}", status);

        let mut body = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    warn!("Failed to read server response: {}", e);
                    break;
                }
            }
        }
        self.advance(SubmitState::ResponseReceived);
        (status, String::from_utf8_lossy(&body).trim().to_string())
    }
}
