//! Caller identity extraction.
//!
//! Authentication itself happens upstream: the API gateway verifies the session and injects the caller's profile id
//! and roles as trusted headers before the request reaches this server. This module only reads those headers back
//! out. A request without a profile id is rejected with 401.

use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use escrow_engine::db_types::Actor;

use crate::errors::ServerError;

pub const PROFILE_ID_HEADER: &str = "x-profile-id";
pub const ROLES_HEADER: &str = "x-profile-roles";

/// The authenticated caller, as asserted by the upstream gateway.
#[derive(Debug, Clone)]
pub struct ActorIdentity(Actor);

impl ActorIdentity {
    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

impl Deref for ActorIdentity {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for ActorIdentity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from_request(req))
    }
}

fn identity_from_request(req: &HttpRequest) -> Result<ActorIdentity, ServerError> {
    let id = req
        .headers()
        .get(PROFILE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ServerError::MissingIdentity)?;
    let arbitrator = req
        .headers()
        .get(ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').any(|role| role.trim().eq_ignore_ascii_case("arbitrator")))
        .unwrap_or(false);
    let actor = if arbitrator { Actor::arbitrator(id) } else { Actor::member(id) };
    Ok(ActorIdentity(actor))
}
