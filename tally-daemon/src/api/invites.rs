use axum::extract::{Json, State};
use diesel::Connection;
use tracing::info;

use tally_api_core::{
    DEBT_MAX_BORROWERS, RemoveInviteRequest, RemoveInviteResponse, SendInviteRequest,
    SendInviteResponse,
};
use tally_core::unix_time;
use tally_daemon_db::models::InviteRecord;

use super::{ApiError, AuthUser, validate_email};
use crate::{AppState, db};

#[axum::debug_handler]
pub async fn send_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendInviteRequest>,
) -> Result<Json<SendInviteResponse>, ApiError> {
    validate_email(&request.email)?;

    if request.email == user.email {
        return Err(ApiError::bad_request("You cannot invite yourself"));
    }

    let mut conn = state.db.get_connection().await;

    let response = conn.transaction::<_, ApiError, _>(|conn| {
        let debt = db::get_debt_for_lender(conn, &request.debt_id, &user.id)?
            .filter(|debt| debt.archived_at.is_none())
            .ok_or_else(|| ApiError::not_found("Debt not found"))?;

        let borrowers = db::list_borrowers(conn, &debt.id)?;

        if borrowers.iter().any(|(_, user)| user.email == request.email) {
            return Err(ApiError::bad_request("User is already a borrower"));
        }

        let invites = db::list_invites(conn, &debt.id)?;

        if invites
            .iter()
            .any(|invite| invite.invitee_email == request.email)
        {
            return Err(ApiError::bad_request("User already has a pending invite"));
        }

        if borrowers.len() + invites.len() >= DEBT_MAX_BORROWERS {
            return Err(ApiError::bad_request(
                "Debt has reached the maximum number of borrowers",
            ));
        }

        db::create_invite(
            conn,
            &InviteRecord {
                debt_id: debt.id.clone(),
                invitee_email: request.email.clone(),
                inviter_id: user.id.clone(),
                created_at: unix_time(),
            },
        )?;

        Ok(SendInviteResponse {
            invitee_email: request.email.clone(),
            debt_id: debt.id,
            debt_name: debt.name,
        })
    })?;

    info!(?response.debt_id, ?response.invitee_email, "Invite sent");

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn remove_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RemoveInviteRequest>,
) -> Result<Json<RemoveInviteResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let removed = db::delete_invite(&mut conn, &request.debt_id, &request.invitee_email, &user.id)?;

    if removed == 0 {
        return Err(ApiError::not_found("Invite not found"));
    }

    info!(?request.debt_id, ?request.invitee_email, "Invite removed");

    Ok(Json(RemoveInviteResponse {
        debt_id: request.debt_id,
        invitee_email: request.invitee_email,
    }))
}
