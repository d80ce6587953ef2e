use hyper::{Method, StatusCode};
use rand::seq::SliceRandom;

use tournament_registry_api::id::MatchId;
use tournament_registry_api::matches::{
    BracketSummary, GenerateBracket, InsufficientTeams, PartialMatch,
};
use tournament_registry_core::options::GenerateOptions;
use tournament_registry_core::{generate, generate_with, Bracket, Error as BracketError, Slot};

use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::GET => list(req).await,
        }),
        Some(part) => {
            let id = part.parse()?;

            method!(req, {
                Method::GET => get(req, id).await,
                Method::PATCH => patch(req, id).await,
            })
        }
    }
}

/// Routes `/v1/bracket`: generation and clearing of the whole match set.
pub async fn bracket_route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        None => method!(req, {
            Method::POST => create(req).await,
            Method::DELETE => clear(req).await,
        }),
        _ => Err(StatusCodeError::not_found().into()),
    }
}

async fn list(req: Request) -> Result {
    let matches = req.state().store.matches().list().await?;

    Ok(Response::ok().json(&matches))
}

async fn get(req: Request, id: MatchId) -> Result {
    let record = req.state().store.matches().get(id).await?;

    let record = record.ok_or_else(StatusCodeError::not_found)?;

    Ok(Response::ok().json(&record))
}

async fn patch(mut req: Request, id: MatchId) -> Result {
    req.require_authentication()?;

    let mut records = req.state().store.matches().list().await?;
    let before = records.clone();

    let record = records
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or_else(StatusCodeError::not_found)?;

    let partial: PartialMatch = req.json().await?;

    // Direct slot assignment is how upper bracket losers get wired into the
    // lower bracket.
    if let Some(team) = partial.team1 {
        record.inner.slots[0] = Slot::Team(team);
    }

    if let Some(team) = partial.team2 {
        record.inner.slots[1] = Slot::Team(team);
    }

    if let Some(scores) = partial.scores {
        record.inner.scores = scores;
    }

    if let Some(status) = partial.status {
        record.inner.status = status;
    }

    if let Some(time) = partial.scheduled_time {
        record.scheduled_time = Some(time);
    }

    if let Some(winner) = partial.winner {
        // Reporting a winner finishes the match and resolves every
        // dependent placeholder across the bracket.
        let number = record.inner.number;
        let scores = record.inner.scores;

        let mut bracket = Bracket::resume(
            records.iter().map(|record| record.inner.clone()).collect(),
            0,
        );

        bracket
            .report_result(number, scores, winner)
            .map_err(|err| StatusCodeError::bad_request().message(err))?;

        for (record, inner) in records.iter_mut().zip(bracket.into_matches()) {
            record.inner = inner;
        }
    }

    for (old, new) in before.iter().zip(&records) {
        if old != new {
            req.state().store.matches().update(new.id, new).await?;
        }
    }

    let record = records
        .into_iter()
        .find(|record| record.id == id)
        .ok_or_else(StatusCodeError::not_found)?;

    Ok(Response::ok().json(&record))
}

async fn create(mut req: Request) -> Result {
    req.require_authentication()?;

    let settings: GenerateBracket = req.json().await?;

    let teams = req.state().store.teams().list_approved().await?;
    let seeds: Vec<_> = teams.iter().map(|team| team.id).collect();

    let mut options = GenerateOptions::new(settings.bracket_type);
    options.grand_final = settings.grand_final;

    let result = if settings.shuffle {
        generate_with(seeds, options, |teams| {
            teams.shuffle(&mut rand::thread_rng())
        })
    } else {
        generate(seeds, options)
    };

    let bracket = match result {
        Ok(bracket) => bracket,
        Err(BracketError::NotEnoughTeams { found }) => {
            return Ok(Response::ok()
                .status(StatusCode::PRECONDITION_FAILED)
                .json(&InsufficientTeams {
                    approved_count: found,
                }));
        }
        Err(err) => return Err(StatusCodeError::bad_request().message(err).into()),
    };

    req.state()
        .store
        .matches()
        .replace_all(bracket.matches())
        .await?;

    log::info!(
        "Generated bracket with {} matches for {} teams",
        bracket.matches_created(),
        bracket.teams()
    );

    Ok(Response::created().json(&BracketSummary {
        matches_created: bracket.matches_created(),
        teams_count: bracket.teams(),
    }))
}

async fn clear(req: Request) -> Result {
    req.require_authentication()?;

    req.state().store.matches().clear().await?;

    Ok(Response::ok())
}
