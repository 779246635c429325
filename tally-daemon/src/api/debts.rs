use std::collections::HashSet;

use axum::extract::{Json, State};
use chrono::DateTime;
use diesel::Connection;
use tracing::info;

use tally_api_core::{
    ArchiveDebtRequest, ArchiveDebtResponse, BorrowerDebtStatus, CURRENCIES, CreateDebtRequest,
    DEBT_MAX_AMOUNT_CENTS, DEBT_MAX_BORROWERS, DEBT_MAX_DESCRIPTION_CHARS, DEBT_MAX_NAME_CHARS,
    DEBT_MIN_AMOUNT_CENTS, DEBTS_PAGE_SIZE, DebtInfo, DebtMember, DebtMembersRequest,
    DebtMembersResponse, DebtTerms, LenderDebtStatus, ListBorrowerDebtsRequest, ListDebtsResponse,
    ListLenderDebtsRequest, PartnerRole, PartnersRequest, PartnersResponse, PaymentStatus,
    SortDirection,
};
use tally_core::{new_id, unix_time};
use tally_daemon_db::models::{DebtRecord, InviteRecord};

use super::{ApiError, AuthUser, validate_email};
use crate::{AppState, convert, db};

#[axum::debug_handler]
pub async fn create_debt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateDebtRequest>,
) -> Result<Json<DebtInfo>, ApiError> {
    let info = &request.general_info;

    let name = info.name.trim();

    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    if name.chars().count() > DEBT_MAX_NAME_CHARS {
        return Err(ApiError::bad_request("Name is too long"));
    }

    let description = info
        .description
        .as_deref()
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(String::from);

    if let Some(description) = description.as_deref() {
        if description.chars().count() > DEBT_MAX_DESCRIPTION_CHARS {
            return Err(ApiError::bad_request("Description is too long"));
        }
    }

    let amount = info.amount.cents();

    if !(DEBT_MIN_AMOUNT_CENTS..=DEBT_MAX_AMOUNT_CENTS).contains(&amount) {
        return Err(ApiError::bad_request(
            "Amount must be between 1.00 and 1,000,000,000.00",
        ));
    }

    if !CURRENCIES.contains(&info.currency.as_str()) {
        return Err(ApiError::bad_request("Unsupported currency"));
    }

    let (due_date, recurring_frequency, duration) = match &info.terms {
        DebtTerms::Single { due_date } => {
            let due_date = due_date
                .as_deref()
                .map(|date| {
                    let date = DateTime::parse_from_rfc3339(date)
                        .map_err(|_| ApiError::bad_request("Invalid due date"))?
                        .timestamp_millis();

                    if date <= unix_time() {
                        return Err(ApiError::bad_request("Due date must be in the future"));
                    }

                    Ok(date)
                })
                .transpose()?;

            (due_date, None, None)
        }
        DebtTerms::Recurrent { frequency, cycles } => {
            if *cycles < 2 || *cycles > frequency.max_cycles() {
                return Err(ApiError::bad_request(format!(
                    "{} debts must run between 2 and {} cycles",
                    frequency.as_str(),
                    frequency.max_cycles()
                )));
            }

            (None, Some(frequency.as_str().to_string()), Some(*cycles))
        }
    };

    if request.borrower_emails.is_empty() {
        return Err(ApiError::bad_request("At least one borrower is required"));
    }

    if request.borrower_emails.len() > DEBT_MAX_BORROWERS {
        return Err(ApiError::bad_request(format!(
            "At most {DEBT_MAX_BORROWERS} borrowers can be invited"
        )));
    }

    for email in &request.borrower_emails {
        validate_email(email)?;

        if *email == user.email {
            return Err(ApiError::bad_request("You cannot invite yourself"));
        }
    }

    let unique = request.borrower_emails.iter().collect::<HashSet<_>>();

    if unique.len() != request.borrower_emails.len() {
        return Err(ApiError::bad_request("Duplicate borrower emails"));
    }

    let record = DebtRecord {
        id: new_id(),
        lender_id: user.id.clone(),
        name: name.to_string(),
        description,
        amount,
        currency: info.currency.clone(),
        due_date,
        recurring_frequency,
        duration,
        archived_at: None,
        created_at: unix_time(),
    };

    let invites = request
        .borrower_emails
        .iter()
        .map(|email| InviteRecord {
            debt_id: record.id.clone(),
            invitee_email: email.clone(),
            inviter_id: user.id.clone(),
            created_at: unix_time(),
        })
        .collect::<Vec<_>>();

    let mut conn = state.db.get_connection().await;

    let response = conn.transaction::<_, ApiError, _>(|conn| {
        db::create_debt(conn, &record)?;

        db::create_invites(conn, &invites)?;

        convert::debt_info(conn, record)
    })?;

    info!(?response.id, invitees = invites.len(), "Debt created");

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn archive_debt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ArchiveDebtRequest>,
) -> Result<Json<ArchiveDebtResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    conn.transaction::<_, ApiError, _>(|conn| {
        let archived = db::archive_debt(conn, &request.debt_id, &user.id, unix_time())?;

        if archived == 0 {
            return Err(ApiError::not_found("Debt not found"));
        }

        // Outstanding invites die with the debt
        db::delete_debt_invites(conn, &request.debt_id)?;

        Ok(())
    })?;

    info!(?request.debt_id, "Debt archived");

    Ok(Json(ArchiveDebtResponse {
        debt_id: request.debt_id,
    }))
}

#[axum::debug_handler]
pub async fn get_lender_debts(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ListLenderDebtsRequest>,
) -> Result<Json<ListDebtsResponse>, ApiError> {
    if let Some(partner_email) = request.partner_email.as_deref() {
        validate_email(partner_email)?;
    }

    let mut conn = state.db.get_connection().await;

    let mut debts = Vec::new();

    for record in db::lender_debts(&mut conn, &user.id)? {
        debts.push(convert::debt_info(&mut conn, record)?);
    }

    let debts = debts
        .into_iter()
        .filter(|debt| match request.status {
            LenderDebtStatus::Active => debt.archived_at.is_none(),
            LenderDebtStatus::Archived => debt.archived_at.is_some(),
            LenderDebtStatus::All => true,
            LenderDebtStatus::PendingConfirmation => debt
                .borrowers
                .iter()
                .flat_map(|borrower| &borrower.payments)
                .any(|payment| payment.status == PaymentStatus::PendingConfirmation),
        })
        .filter(|debt| match request.partner_email.as_deref() {
            Some(partner_email) => debt
                .borrowers
                .iter()
                .any(|borrower| borrower.user.email == partner_email),
            None => true,
        })
        .collect::<Vec<_>>();

    Ok(Json(page(debts, request.sort, request.skip)))
}

#[axum::debug_handler]
pub async fn get_borrower_debts(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ListBorrowerDebtsRequest>,
) -> Result<Json<ListDebtsResponse>, ApiError> {
    if let Some(partner_email) = request.partner_email.as_deref() {
        validate_email(partner_email)?;
    }

    let mut conn = state.db.get_connection().await;

    let mut debts = Vec::new();

    for record in db::borrower_debts(&mut conn, &user.id)? {
        debts.push(convert::debt_info(&mut conn, record)?);
    }

    let debts = debts
        .into_iter()
        .filter(|debt| match request.status {
            BorrowerDebtStatus::Active => debt.archived_at.is_none(),
            // A borrower's view of "done" is balance based: the lender
            // archived it, nothing is owed, and no payment is still
            // awaiting confirmation.
            BorrowerDebtStatus::Archived => {
                debt.archived_at.is_some()
                    && debt
                        .borrowers
                        .iter()
                        .filter(|borrower| borrower.user.id == user.id)
                        .all(|borrower| {
                            borrower.balance.is_zero()
                                && borrower.payments.iter().all(|payment| {
                                    payment.status != PaymentStatus::PendingConfirmation
                                })
                        })
            }
            BorrowerDebtStatus::All => true,
        })
        .filter(|debt| match request.partner_email.as_deref() {
            Some(partner_email) => debt.lender.email == partner_email,
            None => true,
        })
        .collect::<Vec<_>>();

    Ok(Json(page(debts, request.sort, request.skip)))
}

/// Sorts by creation time, then cuts one fixed-size page. The count is
/// taken before paging so the client can size its pagination.
fn page(mut debts: Vec<DebtInfo>, sort: SortDirection, skip: usize) -> ListDebtsResponse {
    match sort {
        SortDirection::Asc => debts.sort_by_key(|debt| debt.created_at),
        SortDirection::Desc => debts.sort_by_key(|debt| std::cmp::Reverse(debt.created_at)),
    }

    let count = debts.len();

    let debts = debts
        .into_iter()
        .skip(skip)
        .take(DEBTS_PAGE_SIZE)
        .collect();

    ListDebtsResponse { debts, count }
}

#[axum::debug_handler]
pub async fn get_partners(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PartnersRequest>,
) -> Result<Json<PartnersResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let users = match request.role {
        PartnerRole::Lender => db::lender_partner_users(&mut conn, &user.id)?,
        PartnerRole::Borrower => db::borrower_partner_users(&mut conn, &user.id)?,
    };

    let mut seen = HashSet::new();

    let partners = users
        .into_iter()
        .filter(|user| seen.insert(user.id.clone()))
        .map(convert::partner_info)
        .collect();

    Ok(Json(PartnersResponse { partners }))
}

#[axum::debug_handler]
pub async fn get_debt_members(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<DebtMembersRequest>,
) -> Result<Json<DebtMembersResponse>, ApiError> {
    let mut conn = state.db.get_connection().await;

    let debt = db::get_debt_for_lender(&mut conn, &request.debt_id, &user.id)?
        .ok_or_else(|| ApiError::not_found("Debt not found"))?;

    let borrowers = db::list_borrowers(&mut conn, &debt.id)?
        .into_iter()
        .map(|(borrower, user)| DebtMember {
            user: convert::user_info(user),
            balance: tally_core::money::Amount::from_cents(borrower.balance),
        })
        .collect();

    let pending_invites = db::list_invites(&mut conn, &debt.id)?
        .into_iter()
        .map(|invite| invite.invitee_email)
        .collect();

    Ok(Json(DebtMembersResponse {
        borrowers,
        pending_invites,
    }))
}
