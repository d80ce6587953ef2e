use hyper::Method;

use tournament_registry_api::auth::{Claims, LoginData, RefreshToken};

use crate::auth::password_hash;
use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        Some("login") => method!(req, {
            Method::POST => login(req).await,
        }),
        Some("refresh") => method!(req, {
            Method::POST => refresh(req).await,
        }),
        _ => Err(StatusCodeError::not_found().into()),
    }
}

async fn login(mut req: Request) -> Result {
    let data: LoginData = req.json().await?;

    let admin = match req
        .state()
        .store
        .admins()
        .get_by_username(&data.username)
        .await?
    {
        Some(admin) => admin,
        None => return Err(StatusCodeError::unauthorized().into()),
    };

    // The stored hash is salted with the admin id.
    if password_hash(&data.password, admin.id.0.to_le_bytes()) != admin.password {
        return Err(StatusCodeError::unauthorized().into());
    }

    let tokens = req.state().auth.create_tokens(Claims::new(admin.id.0))?;

    Ok(Response::ok().json(&tokens))
}

async fn refresh(mut req: Request) -> Result {
    let body: RefreshToken = req.json().await?;

    match req.state().auth.validate_refresh_token(body.refresh_token) {
        Ok(token) => {
            let tokens = req.state().auth.create_tokens(token.into_claims())?;
            Ok(Response::ok().json(&tokens))
        }
        Err(_) => Err(StatusCodeError::unauthorized().into()),
    }
}
