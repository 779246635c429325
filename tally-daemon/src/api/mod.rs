mod debts;
mod invites;
mod payments;

use std::fmt::Display;
use std::net::SocketAddr;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tally_api_core::{
    ROUTE_DEBT_ARCHIVE, ROUTE_DEBT_BORROWER_LIST, ROUTE_DEBT_CREATE, ROUTE_DEBT_LENDER_LIST,
    ROUTE_DEBT_MEMBERS, ROUTE_DEBT_PARTNERS, ROUTE_INVITE_REMOVE, ROUTE_INVITE_SEND,
    ROUTE_PAYMENT_ADD, ROUTE_PAYMENT_BORROWER_LIST, ROUTE_PAYMENT_CONFIRM,
    ROUTE_PAYMENT_LENDER_LIST, ROUTE_PAYMENT_REMOVE,
};

use crate::{AppState, db};

pub async fn run_api(bind: SocketAddr, app_state: AppState, ct: CancellationToken) {
    let listener = TcpListener::bind(bind)
        .await
        .expect("Failed to bind API server");

    info!(?bind, "Starting API server");

    axum::serve(listener, router().with_state(app_state))
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .expect("Failed to start API server");
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(ROUTE_DEBT_CREATE, post(debts::create_debt))
        .route(ROUTE_DEBT_ARCHIVE, post(debts::archive_debt))
        .route(ROUTE_DEBT_LENDER_LIST, post(debts::get_lender_debts))
        .route(ROUTE_DEBT_BORROWER_LIST, post(debts::get_borrower_debts))
        .route(ROUTE_DEBT_PARTNERS, post(debts::get_partners))
        .route(ROUTE_DEBT_MEMBERS, post(debts::get_debt_members))
        .route(ROUTE_INVITE_SEND, post(invites::send_invite))
        .route(ROUTE_INVITE_REMOVE, post(invites::remove_invite))
        .route(ROUTE_PAYMENT_ADD, post(payments::add_payment))
        .route(ROUTE_PAYMENT_REMOVE, post(payments::remove_payment))
        .route(ROUTE_PAYMENT_CONFIRM, post(payments::confirm_payment))
        .route(
            ROUTE_PAYMENT_BORROWER_LIST,
            post(payments::get_payments_as_borrower),
        )
        .route(
            ROUTE_PAYMENT_LENDER_LIST,
            post(payments::get_payments_as_lender),
        )
}

#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub error: String,
}

impl ApiError {
    pub fn bad_request(error: impl Display) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            error: error.to_string(),
        }
    }

    pub fn not_found(error: impl Display) -> Self {
        Self {
            code: StatusCode::NOT_FOUND,
            error: error.to_string(),
        }
    }

    pub fn unauthorized(error: impl Display) -> Self {
        Self {
            code: StatusCode::UNAUTHORIZED,
            error: error.to_string(),
        }
    }

    /// Logs the underlying error and hides it from the caller.
    pub fn internal(error: impl Display) -> Self {
        error!(%error, "Internal error");

        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal error".to_string(),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => ApiError::not_found("Not found"),
            error => ApiError::internal(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.code, self.error).into_response()
    }
}

/// The identity attached to every protected request by the upstream
/// identity provider, reduced to the ledger's own user id and the
/// verified email.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = header(parts, "x-user-email")
            .ok_or_else(|| ApiError::unauthorized("Missing identity"))?;

        let name = header(parts, "x-user-name");
        let image = header(parts, "x-user-image");

        let mut conn = state.db.get_connection().await;

        let user = db::upsert_user(&mut conn, &email, name, image)?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = matches!(email.split('@').collect::<Vec<_>>().as_slice(),
        [local, domain] if !local.is_empty()
            && domain.contains('.')
            && domain.split('.').all(|label| !label.is_empty()))
        && !email.chars().any(char::is_whitespace);

    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email address"))
    }
}


#[cfg(test)]
pub(crate) mod testing {
    use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};

    use tally_api_core::{CreateDebtRequest, DebtGeneralInfo, DebtTerms};
    use tally_core::db::Database;
    use tally_core::money::Amount;
    use tally_core::unix_time;
    use tally_daemon_db::models::BorrowerRecord;
    use tally_daemon_db::schema::{borrower, pending_invite};

    use super::AuthUser;
    use crate::{AppState, db};

    pub fn state() -> AppState {
        AppState {
            db: Database::new_in_memory(tally_daemon_db::MIGRATIONS)
                .expect("Failed to open in-memory database"),
        }
    }

    pub async fn signup(state: &AppState, email: &str) -> AuthUser {
        let mut conn = state.db.get_connection().await;

        let user = db::upsert_user(&mut conn, email, None, None).expect("Failed to upsert user");

        AuthUser {
            id: user.id,
            email: user.email,
        }
    }

    pub fn general_info(amount_cents: i64) -> DebtGeneralInfo {
        DebtGeneralInfo {
            name: "Rent".to_string(),
            description: None,
            amount: Amount::from_cents(amount_cents),
            currency: "COP".to_string(),
            terms: DebtTerms::Single { due_date: None },
        }
    }

    pub fn create_debt_request(amount_cents: i64, borrower_emails: &[&str]) -> CreateDebtRequest {
        CreateDebtRequest {
            general_info: general_info(amount_cents),
            borrower_emails: borrower_emails.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Emulates the post-acceptance state of an invite: the pending
    /// invite is gone and a borrower row exists with the full debt
    /// amount as its starting balance.
    pub async fn accept_invite(state: &AppState, debt_id: &str, user: &AuthUser) {
        let mut conn = state.db.get_connection().await;

        let debt = db::get_debt(&mut conn, debt_id)
            .expect("Failed to query debt")
            .expect("Debt not found");

        diesel::delete(
            pending_invite::table
                .filter(pending_invite::debt_id.eq(debt_id))
                .filter(pending_invite::invitee_email.eq(&user.email)),
        )
        .execute(&mut *conn)
        .expect("Failed to delete invite");

        diesel::insert_into(borrower::table)
            .values(&BorrowerRecord {
                user_id: user.id.clone(),
                debt_id: debt_id.to_string(),
                balance: debt.amount,
                created_at: unix_time(),
            })
            .execute(&mut *conn)
            .expect("Failed to create borrower");
    }
}
