mod v1;

use std::convert::Infallible;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use hyper::header::{
    HeaderValue, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpSocket;
use tokio::sync::watch;
use tokio::time::Instant;

use tournament_registry_api::auth::Claims;

use crate::config::BindAddr;
use crate::{Error, State, StatusCodeError};

pub type Result = std::result::Result<Response, Error>;

pub async fn bind(state: State) -> std::result::Result<(), crate::Error> {
    let mut shutdown_rx = state.shutdown_rx.clone();

    match state.config.bind.clone() {
        BindAddr::Tcp(addr) => {
            let socket = match addr {
                std::net::SocketAddr::V4(_) => TcpSocket::new_v4()?,
                std::net::SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };

            if let Err(err) = socket.set_reuseaddr(true) {
                log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
            }

            socket.bind(addr)?;
            let listener = socket.listen(1024)?;
            log::info!("Listening on {}", addr);

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        let (stream, addr) = match res {
                            Ok((stream, addr)) => (stream, addr),
                            Err(err) => {
                                log::warn!("Failed to accept connection: {:?}", err);
                                continue;
                            }
                        };
                        log::debug!("Accepting new connection from {:?}", addr);

                        tokio::task::spawn(serve_connection(
                            stream,
                            state.clone(),
                            shutdown_rx.clone(),
                        ));
                    }
                    // Shut down the server.
                    _ = shutdown_rx.changed() => {
                        log::debug!("Shutting down http server");
                        return Ok(());
                    }
                }
            }
        }
        #[cfg(unix)]
        BindAddr::Unix(path) => {
            // A previous run may have left the socket file behind.
            let _ = std::fs::remove_file(&path);

            let listener = tokio::net::UnixListener::bind(&path)?;
            log::info!("Listening on {}", path.display());

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        let (stream, _) = match res {
                            Ok(conn) => conn,
                            Err(err) => {
                                log::warn!("Failed to accept connection: {:?}", err);
                                continue;
                            }
                        };

                        tokio::task::spawn(serve_connection(
                            stream,
                            state.clone(),
                            shutdown_rx.clone(),
                        ));
                    }
                    _ = shutdown_rx.changed() => {
                        log::debug!("Shutting down http server");
                        return Ok(());
                    }
                }
            }
        }
        #[cfg(not(unix))]
        BindAddr::Unix(_) => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        )
        .into()),
    }
}

async fn serve_connection<S>(stream: S, state: State, mut shutdown_rx: watch::Receiver<bool>)
where
    S: AsyncRead + AsyncWrite + Unpin + 'static,
{
    let service = service_fn(move |req| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(serve_request(req, state).await) }
    });

    let mut conn = Http::new()
        .http1_keep_alive(true)
        .serve_connection(stream, service);
    let mut conn = Pin::new(&mut conn);

    tokio::select! {
        res = &mut conn => {
            if let Err(err) = res {
                log::warn!("Http error: {:?}", err);
            }
        }
        _ = shutdown_rx.changed() => {
            log::debug!("Shutting down connection");
            conn.as_mut().graceful_shutdown();

            if let Err(err) = conn.await {
                log::warn!("Http error: {:?}", err);
            }
        }
    }
}

async fn serve_request(req: hyper::Request<Body>, state: State) -> hyper::Response<Body> {
    log::trace!("Received Request:");
    log::trace!("Head: {} {}", req.method(), req.uri());
    log::trace!("Headers: {:?}", req.headers());

    let req = Request::new(req, state);

    // Reject oversized (or unsized) bodies before reading them.
    let method = req.method();
    if method == Method::POST || method == Method::PUT || method == Method::PATCH {
        if let Err(err) = check_body_size(&req) {
            return render_error(err);
        }
    }

    let path = String::from(req.uri().path());
    let mut uri = RequestUri::new(&path);

    log::debug!("{:?}", uri);

    let origin = req.headers().get("Origin").cloned();

    let res = match uri.take_str() {
        Some("v1") => v1::route(req, uri).await,
        _ => Err(Error::NotFound),
    };

    match res {
        Ok(mut resp) => {
            if let Some(origin) = origin {
                resp = resp.header(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }

            resp = resp.header(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type,authorization"),
            );

            resp.build()
        }
        Err(err) => render_error(err),
    }
}

fn check_body_size(req: &Request) -> std::result::Result<(), Error> {
    const MAX_BODY_SIZE: u64 = 16384;

    let length = req.content_length()?;

    if length > MAX_BODY_SIZE {
        return Err(StatusCodeError::payload_too_large().into());
    }

    Ok(())
}

fn render_error(err: Error) -> hyper::Response<Body> {
    let mut resp = Response::ok();

    match err {
        Error::NotFound => {
            resp = resp.status(StatusCode::NOT_FOUND).body("Not Found");
        }
        Error::BadRequest => {
            resp = resp.status(StatusCode::BAD_REQUEST).body("Bad Request");
        }
        Error::StatusCodeError(err) => {
            resp = resp.status(err.code).json(&ErrorResponse {
                code: err.code.as_u16(),
                message: err.message,
            });
        }
        err => {
            log::error!("{:?}", err);

            resp = resp
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("Internal Server Error");
        }
    }

    resp.build()
}

#[derive(Debug)]
pub struct Request {
    pub parts: Parts,
    pub body: Option<Body>,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            parts,
            body: Some(body),
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Reads the body and deserializes it as JSON.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if reading times out or the body is not the
    /// expected JSON.
    pub async fn json<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned,
    {
        const DUR: Duration = Duration::new(30, 0);

        let deadline = Instant::now() + DUR;

        let bytes = tokio::select! {
            res = hyper::body::to_bytes(self.body.take().unwrap()) => {
                res?
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::info!("Client failed to transmit body in {}s, dropping connection", DUR.as_secs());
                return Err(StatusCodeError::request_timeout().into());
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => Err(StatusCodeError::bad_request().message(err).into()),
        }
    }

    /// Returns the value of the "Content-Length" header. If the header is not
    /// present or has an invalid value an error is returned.
    pub fn content_length(&self) -> std::result::Result<u64, Error> {
        let value = match self.headers().get("Content-Length") {
            Some(value) => value,
            None => return Err(StatusCodeError::length_required().into()),
        };

        match value.to_str().map(|value| value.parse()) {
            Ok(Ok(value)) => Ok(value),
            _ => {
                log::debug!("Failed to parse \"Content-Length\" header");

                Err(StatusCodeError::bad_request().into())
            }
        }
    }

    /// Validates the Bearer auth token of the request and returns its
    /// [`Claims`].
    ///
    /// # Errors
    ///
    /// Returns an unauthorized [`StatusCodeError`] if the request carries no
    /// valid auth token.
    pub fn require_authentication(&self) -> std::result::Result<Claims, Error> {
        let header = match self.headers().get("Authorization") {
            Some(header) => header,
            None => return Err(StatusCodeError::unauthorized().into()),
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(StatusCodeError::unauthorized)?;

        match self.state.auth.validate_auth_token(token) {
            Ok(token) => Ok(token.into_claims()),
            Err(err) => {
                log::debug!("Token validation failed: {:?}", err);

                Err(StatusCodeError::unauthorized().into())
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RequestUri<'a> {
    path: &'a str,
}

impl<'a> RequestUri<'a> {
    pub fn new(mut path: &'a str) -> Self {
        if let Some(stripped) = path.strip_prefix('/') {
            path = stripped;
        }

        Self { path }
    }

    pub fn take(&mut self) -> Option<UriPart<'a>> {
        let part = self.take_str()?;

        Some(UriPart { part })
    }

    pub fn take_str(&mut self) -> Option<&'a str> {
        if self.path.is_empty() {
            None
        } else {
            Some(match self.path.split_once('/') {
                Some((part, rem)) => {
                    self.path = rem;
                    part
                }
                None => {
                    let path = self.path;
                    self.path = "";
                    path
                }
            })
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct UriPart<'a> {
    part: &'a str,
}

impl<'a> UriPart<'a> {
    pub fn parse<T>(&self) -> std::result::Result<T, Error>
    where
        T: FromStr,
    {
        match self.part.parse() {
            Ok(v) => Ok(v),
            Err(_) => Err(Error::BadRequest),
        }
    }
}

impl<'a> AsRef<str> for UriPart<'a> {
    fn as_ref(&self) -> &str {
        self.part
    }
}

impl<'a> PartialEq<str> for UriPart<'a> {
    fn eq(&self, other: &str) -> bool {
        self.part == other
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 201 Created
    pub fn created() -> Self {
        Self {
            status: StatusCode::CREATED,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn body<T>(mut self, body: T) -> Self
    where
        T: Into<Body>,
    {
        self.body = body.into();
        self
    }

    pub fn json<T>(mut self, body: &T) -> Self
    where
        T: Serialize,
    {
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// Checks the request method and runs the specified path. If no matching
/// method is found an method_not_allowed error is returned. OPTIONS requests
/// are answered with the allowed methods.
#[macro_export]
macro_rules! method {
    ($req:expr, {$($method:expr => $branch:expr),* $(,)?}) => {
        match $req.method() {
            $(
                method if method == $method => $branch,
            )*
            method if method == hyper::Method::OPTIONS => {
                use hyper::header::{HeaderValue, ALLOW, ACCESS_CONTROL_ALLOW_METHODS};

                use $crate::http::Response;

                let allow = vec![$($method.as_str()),*];
                let allow = HeaderValue::from_bytes(allow.join(",").as_bytes()).unwrap();

                Ok(Response::no_content()
                    .header(ALLOW, allow.clone())
                    .header(ACCESS_CONTROL_ALLOW_METHODS, allow))
            }
            _ => Err($crate::StatusCodeError::method_not_allowed().into()),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::RequestUri;

    #[test]
    fn test_request_uri() {
        let path = "/v1/teams/3";
        let mut uri = RequestUri::new(path);

        assert_eq!(uri.take_str(), Some("v1"));
        assert_eq!(uri.take_str(), Some("teams"));

        let part = uri.take().unwrap();
        assert_eq!(part.parse::<u64>().unwrap(), 3);

        assert_eq!(uri.take_str(), None);
    }
}
