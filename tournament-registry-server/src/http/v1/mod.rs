mod admins;
mod auth;
mod matches;
mod settings;
mod teams;
mod telegram;

use crate::http::{Request, RequestUri, Response};
use crate::Error;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result<Response, Error> {
    match uri.take_str() {
        Some("auth") => auth::route(req, uri).await,
        Some("teams") => teams::route(req, uri).await,
        Some("admins") => admins::route(req, uri).await,
        Some("registration") => settings::route(req, uri).await,
        Some("matches") => matches::route(req, uri).await,
        Some("bracket") => matches::bracket_route(req, uri).await,
        Some("telegram") => telegram::route(req, uri).await,
        _ => Err(Error::NotFound),
    }
}
