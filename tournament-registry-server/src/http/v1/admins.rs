use hyper::Method;
use snowflaked::sync::Generator;

use tournament_registry_api::admins::AdminUser;
use tournament_registry_api::id::AdminId;

use crate::auth::password_hash;
use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, Error, StatusCodeError};

static ADMIN_ID_GENERATOR: Generator = Generator::new_unchecked(0);

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::GET => list(req).await,
            Method::POST => create(req).await,
        }),
        Some(part) => {
            let id = part.parse()?;

            method!(req, {
                Method::DELETE => delete(req, id).await,
            })
        }
    }
}

async fn list(req: Request) -> Result {
    require_superadmin(&req).await?;

    let admins = req.state().store.admins().list().await?;

    Ok(Response::ok().json(&admins))
}

async fn create(mut req: Request) -> Result {
    require_superadmin(&req).await?;

    let mut admin: AdminUser = req.json().await?;

    if admin.username.is_empty() || admin.password.is_empty() {
        return Err(StatusCodeError::bad_request()
            .message("username and password must not be empty")
            .into());
    }

    if req
        .state()
        .store
        .admins()
        .get_by_username(&admin.username)
        .await?
        .is_some()
    {
        return Err(StatusCodeError::bad_request()
            .message("username is already taken")
            .into());
    }

    admin.id = AdminId(ADMIN_ID_GENERATOR.generate());
    admin.password = password_hash(&admin.password, admin.id.0.to_le_bytes());

    req.state().store.admins().insert(&admin).await?;

    Ok(Response::created().json(&admin))
}

async fn delete(req: Request, id: AdminId) -> Result {
    let caller = require_superadmin(&req).await?;

    // The last superadmin must not lock itself out.
    if caller.id == id {
        return Err(StatusCodeError::bad_request()
            .message("cannot delete your own account")
            .into());
    }

    req.state().store.admins().delete(id).await?;

    Ok(Response::ok())
}

/// Validates the auth token and requires the calling admin to be a
/// superadmin.
pub async fn require_superadmin(req: &Request) -> std::result::Result<AdminUser, Error> {
    let claims = req.require_authentication()?;

    let admin = req
        .state()
        .store
        .admins()
        .get(AdminId(claims.sub))
        .await?
        .ok_or_else(StatusCodeError::unauthorized)?;

    if !admin.is_superadmin {
        return Err(StatusCodeError::forbidden().into());
    }

    Ok(admin)
}
