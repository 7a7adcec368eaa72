//! Extractor resolving the calling user from the identity header.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

use crate::AppState;
use crate::api::models::users::CurrentUser;
use crate::db::handlers::Users;
use crate::errors::{Error, Result};

/// Read the email asserted by the proxy, if present and non-empty
fn header_email<'a>(parts: &'a Parts, header_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = &state.config.auth;
        let Some(email) = header_email(parts, &auth.header_name) else {
            trace!("No identity header on request");
            return Err(Error::Unauthenticated { message: None });
        };

        let mut conn = state.db.acquire().await?;
        let mut users = Users::new(&mut conn);

        let user = if auth.auto_create_users {
            users.get_or_create_by_email(email).await?
        } else {
            match users.get_user_by_email(email).await? {
                Some(user) => user,
                None => {
                    debug!("Unknown user and auto-creation is disabled");
                    return Err(Error::Unauthenticated {
                        message: Some("Unknown user".to_string()),
                    });
                }
            }
        };

        Ok(user.into())
    }
}
