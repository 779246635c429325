use axum::extract::{Json, State};
use diesel::Connection;
use tracing::info;

use tally_api_core::{
    AddPaymentRequest, AddPaymentResponse, BorrowerPaymentsResponse, ConfirmPaymentRequest,
    ConfirmPaymentResponse, LenderPaymentsResponse, ListPaymentsRequest, PaymentAmount,
    PaymentStatus, RemovePaymentRequest, RemovePaymentResponse,
};
use tally_core::money::Amount;
use tally_core::{new_id, unix_time};
use tally_daemon_db::models::PaymentRecord;

use super::{ApiError, AuthUser};
use crate::{AppState, convert, db};

#[axum::debug_handler]
pub async fn add_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddPaymentRequest>,
) -> Result<Json<AddPaymentResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let response = conn.transaction::<_, ApiError, _>(|conn| {
        let debt = db::get_debt(conn, &request.debt_id)?
            .filter(|debt| debt.archived_at.is_none())
            .ok_or_else(|| ApiError::not_found("Debt not found"))?;

        let borrower = db::get_borrower(conn, &user.id, &debt.id)?
            .ok_or_else(|| ApiError::not_found("Borrower not found"))?;

        let balance = Amount::from_cents(borrower.balance);

        if balance.is_zero() {
            return Err(ApiError::bad_request("Nothing left to pay on this debt"));
        }

        let amount = match request.payment {
            PaymentAmount::Full => balance,
            PaymentAmount::Partial { amount } => amount,
        };

        if amount.cents() <= 0 {
            return Err(ApiError::bad_request("Amount must be positive"));
        }

        let new_balance = balance
            .checked_sub(amount)
            .filter(|balance| balance.cents() >= 0)
            .ok_or_else(|| {
                ApiError::bad_request("Amount is greater than the remaining balance")
            })?;

        let record = PaymentRecord {
            id: new_id(),
            debt_id: debt.id.clone(),
            borrower_id: user.id.clone(),
            amount: amount.cents(),
            status: PaymentStatus::PendingConfirmation.as_str().to_string(),
            created_at: unix_time(),
        };

        db::insert_payment(conn, &record)?;

        db::set_borrower_balance(conn, &user.id, &debt.id, new_balance.cents())?;

        Ok(AddPaymentResponse {
            payment_id: record.id,
            new_balance,
            amount,
        })
    })?;

    info!(?request.debt_id, ?response.payment_id, %response.amount, "Payment recorded");

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn remove_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RemovePaymentRequest>,
) -> Result<Json<RemovePaymentResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    conn.transaction::<_, ApiError, _>(|conn| {
        // Only the borrower's own payments qualify, and only while they
        // still await confirmation.
        let payment = db::get_payment(conn, &request.payment_id)?
            .filter(|payment| payment.borrower_id == user.id)
            .filter(|payment| payment.debt_id == request.debt_id)
            .filter(|payment| payment.status == PaymentStatus::PendingConfirmation.as_str())
            .ok_or_else(|| ApiError::not_found("Payment not found"))?;

        db::get_debt(conn, &payment.debt_id)?
            .filter(|debt| debt.archived_at.is_none())
            .ok_or_else(|| ApiError::not_found("Debt not found"))?;

        let borrower = db::get_borrower(conn, &user.id, &payment.debt_id)?
            .ok_or_else(|| ApiError::not_found("Borrower not found"))?;

        db::delete_payment(conn, &payment.id)?;

        db::set_borrower_balance(
            conn,
            &user.id,
            &payment.debt_id,
            borrower.balance + payment.amount,
        )?;

        Ok(())
    })?;

    info!(?request.debt_id, ?request.payment_id, "Payment retracted");

    Ok(Json(RemovePaymentResponse {
        payment_id: request.payment_id,
        debt_id: request.debt_id,
    }))
}

#[axum::debug_handler]
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    conn.transaction::<_, ApiError, _>(|conn| {
        let debt = db::get_debt_for_lender(conn, &request.debt_id, &user.id)?
            .filter(|debt| debt.archived_at.is_none())
            .ok_or_else(|| ApiError::not_found("Debt not found"))?;

        db::get_borrower(conn, &request.borrower_id, &debt.id)?
            .ok_or_else(|| ApiError::not_found("Borrower not found"))?;

        let updated =
            db::confirm_payment(conn, &request.payment_id, &debt.id, &request.borrower_id)?;

        // Zero rows means the payment is missing, belongs elsewhere or
        // was already settled. All of those read the same to the caller.
        if updated == 0 {
            return Err(ApiError::not_found("Payment not found"));
        }

        Ok(())
    })?;

    info!(?request.debt_id, ?request.payment_id, "Payment confirmed");

    Ok(Json(ConfirmPaymentResponse {
        payment_id: request.payment_id,
        debt_id: request.debt_id,
    }))
}

#[axum::debug_handler]
pub async fn get_payments_as_borrower(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ListPaymentsRequest>,
) -> Result<Json<BorrowerPaymentsResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let Some(debt) = db::get_debt(&mut conn, &request.debt_id)? else {
        return Ok(Json(BorrowerPaymentsResponse { payments: vec![] }));
    };

    let payments = db::borrower_payments(&mut conn, &debt.id, &user.id)?
        .into_iter()
        .map(|record| convert::payment_info(record, &debt.currency))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(BorrowerPaymentsResponse { payments }))
}

#[axum::debug_handler]
pub async fn get_payments_as_lender(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ListPaymentsRequest>,
) -> Result<Json<LenderPaymentsResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let debt = db::get_debt_for_lender(&mut conn, &request.debt_id, &user.id)?
        .ok_or_else(|| ApiError::not_found("Debt not found"))?;

    let mut payments = Vec::new();

    for record in db::debt_payments(&mut conn, &debt.id)? {
        let borrower = db::get_borrower(&mut conn, &record.borrower_id, &debt.id)?
            .ok_or_else(|| ApiError::internal("Payment without borrower"))?;

        let borrower_user = db::get_user(&mut conn, &record.borrower_id)?
            .ok_or_else(|| ApiError::internal("Borrower without user"))?;

        payments.push(convert::lender_payment_info(
            record,
            &debt.currency,
            borrower_user,
            &borrower,
        )?);
    }

    Ok(Json(LenderPaymentsResponse { payments }))
}

#[cfg(test)]
mod tests {
    use axum::extract::{Json, State};
    use axum::http::StatusCode;

    use tally_api_core::{
        AddPaymentRequest, ArchiveDebtRequest, ConfirmPaymentRequest, ListPaymentsRequest,
        PaymentAmount, PaymentStatus, RemovePaymentRequest,
    };
    use tally_core::money::Amount;

    use crate::AppState;
    use crate::api::debts::{archive_debt, create_debt};
    use crate::api::testing::{accept_invite, create_debt_request, signup, state};
    use crate::api::{ApiError, AuthUser};

    use super::{
        add_payment, confirm_payment, get_payments_as_borrower, get_payments_as_lender,
        remove_payment,
    };

    async fn debt_with_borrower(
        state: &AppState,
        lender: &AuthUser,
        borrower: &AuthUser,
        amount_cents: i64,
    ) -> String {
        let debt = create_debt(
            State(state.clone()),
            lender.clone(),
            Json(create_debt_request(amount_cents, &[&borrower.email])),
        )
        .await
        .unwrap()
        .0;

        accept_invite(state, &debt.id, borrower).await;

        debt.id
    }

    async fn pay(
        state: &AppState,
        user: &AuthUser,
        debt_id: &str,
        payment: PaymentAmount,
    ) -> Result<tally_api_core::AddPaymentResponse, ApiError> {
        add_payment(
            State(state.clone()),
            user.clone(),
            Json(AddPaymentRequest {
                debt_id: debt_id.to_string(),
                payment,
            }),
        )
        .await
        .map(|response| response.0)
    }

    #[tokio::test]
    async fn payment_lifecycle_conserves_the_balance() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let partial = pay(
            &state,
            &borrower,
            &debt_id,
            PaymentAmount::Partial {
                amount: Amount::from_cents(4_000),
            },
        )
        .await
        .unwrap();

        assert_eq!(partial.amount, Amount::from_cents(4_000));
        assert_eq!(partial.new_balance, Amount::from_cents(6_000));

        // A full payment settles whatever remains
        let full = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        assert_eq!(full.amount, Amount::from_cents(6_000));
        assert_eq!(full.new_balance, Amount::from_cents(0));

        // Confirming flips the status without touching the balance
        confirm_payment(
            State(state.clone()),
            lender.clone(),
            Json(ConfirmPaymentRequest {
                debt_id: debt_id.clone(),
                borrower_id: borrower.id.clone(),
                payment_id: partial.payment_id.clone(),
            }),
        )
        .await
        .unwrap();

        let payments = get_payments_as_borrower(
            State(state.clone()),
            borrower.clone(),
            Json(ListPaymentsRequest {
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap()
        .0
        .payments;

        assert_eq!(payments.len(), 2);

        for payment in &payments {
            if payment.id == partial.payment_id {
                assert_eq!(payment.status, PaymentStatus::Paid);
            } else {
                assert_eq!(payment.status, PaymentStatus::PendingConfirmation);
            }
        }

        // Retracting the pending payment restores its amount
        remove_payment(
            State(state.clone()),
            borrower.clone(),
            Json(RemovePaymentRequest {
                payment_id: full.payment_id,
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap();

        let retried = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        assert_eq!(retried.amount, Amount::from_cents(6_000));
        assert_eq!(retried.new_balance, Amount::from_cents(0));
    }

    #[tokio::test]
    async fn overpayment_is_rejected_without_side_effects() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let error = pay(
            &state,
            &borrower,
            &debt_id,
            PaymentAmount::Partial {
                amount: Amount::from_cents(10_001),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "Amount is greater than the remaining balance");

        // No payment row was left behind and the full balance survives
        let payments = get_payments_as_borrower(
            State(state.clone()),
            borrower.clone(),
            Json(ListPaymentsRequest {
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap()
        .0
        .payments;

        assert!(payments.is_empty());

        let full = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        assert_eq!(full.amount, Amount::from_cents(10_000));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        for cents in [0, -500] {
            let error = pay(
                &state,
                &borrower,
                &debt_id,
                PaymentAmount::Partial {
                    amount: Amount::from_cents(cents),
                },
            )
            .await
            .unwrap_err();

            assert_eq!(error.code, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn settled_debts_take_no_further_payments() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        let error = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap_err();

        assert_eq!(error.code, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "Nothing left to pay on this debt");
    }

    #[tokio::test]
    async fn archived_debts_take_no_payments() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        archive_debt(
            State(state.clone()),
            lender,
            Json(ArchiveDebtRequest {
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap();

        let error = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn only_borrowers_can_pay() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;
        let stranger = signup(&state, "stranger@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let error = pay(&state, &stranger, &debt_id, PaymentAmount::Full)
            .await
            .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
        assert_eq!(error.error, "Borrower not found");
    }

    #[tokio::test]
    async fn confirming_twice_fails() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let payment = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        let request = ConfirmPaymentRequest {
            debt_id: debt_id.clone(),
            borrower_id: borrower.id.clone(),
            payment_id: payment.payment_id,
        };

        confirm_payment(State(state.clone()), lender.clone(), Json(request.clone()))
            .await
            .unwrap();

        let error = confirm_payment(State(state.clone()), lender, Json(request))
            .await
            .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
        assert_eq!(error.error, "Payment not found");
    }

    #[tokio::test]
    async fn only_the_lender_can_confirm() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let payment = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        let error = confirm_payment(
            State(state.clone()),
            borrower.clone(),
            Json(ConfirmPaymentRequest {
                debt_id,
                borrower_id: borrower.id.clone(),
                payment_id: payment.payment_id,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
        assert_eq!(error.error, "Debt not found");
    }

    #[tokio::test]
    async fn confirmed_payments_cannot_be_retracted() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        let payment = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        confirm_payment(
            State(state.clone()),
            lender,
            Json(ConfirmPaymentRequest {
                debt_id: debt_id.clone(),
                borrower_id: borrower.id.clone(),
                payment_id: payment.payment_id.clone(),
            }),
        )
        .await
        .unwrap();

        let error = remove_payment(
            State(state.clone()),
            borrower,
            Json(RemovePaymentRequest {
                payment_id: payment.payment_id,
                debt_id,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payments_cannot_be_retracted_by_others_or_via_other_debts() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;
        let stranger = signup(&state, "stranger@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;
        let other_debt_id = debt_with_borrower(&state, &lender, &borrower, 5_000).await;

        let payment = pay(&state, &borrower, &debt_id, PaymentAmount::Full)
            .await
            .unwrap();

        let error = remove_payment(
            State(state.clone()),
            stranger,
            Json(RemovePaymentRequest {
                payment_id: payment.payment_id.clone(),
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);

        // The payment id is real but paired with the wrong debt
        let error = remove_payment(
            State(state.clone()),
            borrower,
            Json(RemovePaymentRequest {
                payment_id: payment.payment_id,
                debt_id: other_debt_id,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lender_sees_all_payments_with_borrower_context() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let borrower = signup(&state, "a@tally.test").await;
        let stranger = signup(&state, "stranger@tally.test").await;

        let debt_id = debt_with_borrower(&state, &lender, &borrower, 10_000).await;

        pay(
            &state,
            &borrower,
            &debt_id,
            PaymentAmount::Partial {
                amount: Amount::from_cents(4_000),
            },
        )
        .await
        .unwrap();

        let payments = get_payments_as_lender(
            State(state.clone()),
            lender,
            Json(ListPaymentsRequest {
                debt_id: debt_id.clone(),
            }),
        )
        .await
        .unwrap()
        .0
        .payments;

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].borrower.email, "a@tally.test");
        assert_eq!(payments[0].borrower_balance, Amount::from_cents(6_000));
        assert_eq!(payments[0].currency, "COP");

        let error = get_payments_as_lender(
            State(state.clone()),
            stranger,
            Json(ListPaymentsRequest { debt_id }),
        )
        .await
        .unwrap_err();

        assert_eq!(error.code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn borrowers_see_only_their_own_payments() {
        let state = state();
        let lender = signup(&state, "lender@tally.test").await;
        let first = signup(&state, "a@tally.test").await;
        let second = signup(&state, "b@tally.test").await;

        let debt = create_debt(
            State(state.clone()),
            lender.clone(),
            Json(create_debt_request(10_000, &["a@tally.test", "b@tally.test"])),
        )
        .await
        .unwrap()
        .0;

        accept_invite(&state, &debt.id, &first).await;
        accept_invite(&state, &debt.id, &second).await;

        pay(&state, &first, &debt.id, PaymentAmount::Full)
            .await
            .unwrap();

        let payments = get_payments_as_borrower(
            State(state.clone()),
            second,
            Json(ListPaymentsRequest {
                debt_id: debt.id.clone(),
            }),
        )
        .await
        .unwrap()
        .0
        .payments;

        assert!(payments.is_empty());

        // An unknown debt id yields an empty list, not an error
        let payments = get_payments_as_borrower(
            State(state.clone()),
            first,
            Json(ListPaymentsRequest {
                debt_id: "missing".to_string(),
            }),
        )
        .await
        .unwrap()
        .0
        .payments;

        assert!(payments.is_empty());
    }
}
