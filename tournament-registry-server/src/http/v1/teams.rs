use chrono::Utc;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::Method;
use rand::Rng;

use tournament_registry_api::id::TeamId;
use tournament_registry_api::teams::{
    members_count, PartialTeam, RegisterTeam, Team, TeamRegistered, TeamStatus,
};

use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, Error, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::GET => list(req).await,
            Method::POST => register(req).await,
        }),
        Some(part) => match part.as_ref() {
            "export" => method!(req, {
                Method::GET => export(req).await,
            }),
            "code" => {
                let code = match uri.take_str() {
                    Some(code) => code,
                    None => return Err(StatusCodeError::not_found().into()),
                };

                method!(req, {
                    Method::GET => get_by_code(req, code).await,
                })
            }
            _ => {
                let id = part.parse()?;

                method!(req, {
                    Method::GET => get(req, id).await,
                    Method::PATCH => patch(req, id).await,
                    Method::DELETE => delete(req, id).await,
                })
            }
        },
    }
}

async fn list(req: Request) -> Result {
    let teams = req.state().store.teams().list().await?;

    Ok(Response::ok().json(&teams))
}

async fn get(req: Request, id: TeamId) -> Result {
    let team = req.state().store.teams().get(id).await?;

    let team = team.ok_or_else(StatusCodeError::not_found)?;

    Ok(Response::ok().json(&team))
}

async fn get_by_code(req: Request, code: &str) -> Result {
    let team = req.state().store.teams().get_by_code(code).await?;

    let team = match team {
        Some(team) => team,
        None => {
            return Err(StatusCodeError::not_found()
                .message("No team registered under this code")
                .into())
        }
    };

    Ok(Response::ok().json(&team))
}

async fn register(mut req: Request) -> Result {
    require_registration_open(&req).await?;

    let body: RegisterTeam = req.json().await?;

    let team = Team {
        id: TeamId(0),
        members_count: members_count(&body.members_info),
        name: body.name,
        captain_name: body.captain_name,
        captain_telegram: body.captain_telegram,
        members_info: body.members_info,
        auth_code: generate_auth_code(),
        status: TeamStatus::Pending,
        admin_comment: None,
        created_at: Utc::now(),
    };

    let id = req.state().store.teams().insert(&team).await?;

    let team = Team { id, ..team };

    // Notification failures never fail the registration.
    let chats = req.state().store.admins().notification_chats().await?;
    req.state().notifier.notify_registration(&team, &chats).await;
    req.state().notifier.send_auth_code(&team).await;

    Ok(Response::created().json(&TeamRegistered {
        team_id: id,
        auth_code: team.auth_code,
    }))
}

async fn patch(mut req: Request, id: TeamId) -> Result {
    let mut team = match req.state().store.teams().get(id).await? {
        Some(team) => team,
        None => return Err(StatusCodeError::not_found().into()),
    };

    let partial: PartialTeam = req.json().await?;

    if partial.is_moderation() {
        // Status and comment changes are reserved for admins.
        req.require_authentication()?;

        team.update(partial);
        req.state().store.teams().update(id, &team).await?;
    } else {
        require_registration_open(&req).await?;

        team.update(partial);
        // Edits go back to moderation.
        team.status = TeamStatus::Pending;
        req.state().store.teams().update(id, &team).await?;

        let chats = req.state().store.admins().notification_chats().await?;
        req.state().notifier.notify_edited(&team, &chats).await;
    }

    Ok(Response::ok().json(&team))
}

async fn delete(req: Request, id: TeamId) -> Result {
    // Admins may always delete; captains only while registration is open.
    if req.require_authentication().is_err() {
        require_registration_open(&req).await?;
    }

    req.state().store.teams().delete(id).await?;

    Ok(Response::ok())
}

async fn export(req: Request) -> Result {
    req.require_authentication()?;

    let teams = req.state().store.teams().list().await?;
    let csv = teams_to_csv(&teams);

    Ok(Response::ok()
        .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .body(csv))
}

async fn require_registration_open(req: &Request) -> std::result::Result<(), Error> {
    let settings = req.state().store.settings().get().await?;

    if !settings.is_open {
        return Err(StatusCodeError::forbidden()
            .message("Registration is closed")
            .into());
    }

    Ok(())
}

fn generate_auth_code() -> String {
    let mut rng = rand::thread_rng();

    format!("REG-{:04X}-{:04X}", rng.gen::<u16>(), rng.gen::<u16>())
}

/// Shapes the team list into the CSV handed to admins. Commas and newlines
/// in the roster are replaced so every team stays on one line.
fn teams_to_csv(teams: &[Team]) -> String {
    let mut lines =
        vec!["Team Name,Captain Name,Captain Telegram,Status,Created At,Members Info".to_owned()];

    for team in teams {
        let members = team.members_info.replace('\n', " | ").replace(',', ";");

        lines.push(format!(
            "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"",
            team.name,
            team.captain_name,
            team.captain_telegram,
            team.status,
            team.created_at.format("%Y-%m-%d %H:%M:%S"),
            members
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use tournament_registry_api::id::TeamId;
    use tournament_registry_api::teams::{Team, TeamStatus};

    use super::{generate_auth_code, teams_to_csv};

    #[test]
    fn test_generate_auth_code() {
        let code = generate_auth_code();

        assert_eq!(code.len(), 13);
        assert!(code.starts_with("REG-"));
        assert_eq!(code.as_bytes()[8], b'-');
    }

    #[test]
    fn test_teams_to_csv() {
        let teams = vec![Team {
            id: TeamId(1),
            name: "Crimson Five".to_owned(),
            captain_name: "Alice".to_owned(),
            captain_telegram: "@alice".to_owned(),
            members_count: 2,
            members_info: "alice, mid\nbob, support".to_owned(),
            auth_code: "REG-AB12-CD34".to_owned(),
            status: TeamStatus::Approved,
            admin_comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }];

        let csv = teams_to_csv(&teams);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Team Name,Captain Name,Captain Telegram,Status,Created At,Members Info"
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"Crimson Five\",\"Alice\",\"@alice\",\"approved\",\"2024-05-01 12:00:00\",\"alice; mid | bob; support\""
        );
        assert_eq!(lines.next(), None);
    }
}
