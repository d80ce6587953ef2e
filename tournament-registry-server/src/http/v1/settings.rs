use hyper::Method;

use tournament_registry_api::id::AdminId;
use tournament_registry_api::settings::RegistrationSettings;

use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        None => method!(req, {
            Method::GET => get(req).await,
            Method::PUT => update(req).await,
        }),
        _ => Err(StatusCodeError::not_found().into()),
    }
}

async fn get(req: Request) -> Result {
    let settings = req.state().store.settings().get().await?;

    Ok(Response::ok().json(&settings))
}

async fn update(mut req: Request) -> Result {
    let claims = req.require_authentication()?;

    let mut settings: RegistrationSettings = req.json().await?;

    // Attribute the change to the calling admin.
    let admin = req.state().store.admins().get(AdminId(claims.sub)).await?;
    settings.updated_by = admin.map(|admin| admin.username);

    req.state().store.settings().set(&settings).await?;

    log::info!(
        "Registration is now {}",
        if settings.is_open { "open" } else { "closed" }
    );

    Ok(Response::ok().json(&settings))
}
