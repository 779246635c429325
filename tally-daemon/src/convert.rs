use diesel::SqliteConnection;

use tally_api_core::{
    BorrowerInfo, DebtInfo, LenderPaymentInfo, PartnerInfo, PaymentInfo, PaymentStatus,
    PaymentSummary, RecurringFrequency, UserInfo,
};
use tally_core::money::Amount;
use tally_daemon_db::models::{BorrowerRecord, DebtRecord, PaymentRecord, User};

use crate::api::ApiError;
use crate::db;

pub fn user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email,
        name: user.name,
        image: user.image,
    }
}

pub fn partner_info(user: User) -> PartnerInfo {
    PartnerInfo {
        email: user.email,
        name: user.name,
        image: user.image,
    }
}

fn payment_status(record: &PaymentRecord) -> Result<PaymentStatus, ApiError> {
    PaymentStatus::parse(&record.status)
        .ok_or_else(|| ApiError::internal(format!("Unknown payment status '{}'", record.status)))
}

pub fn payment_summary(record: PaymentRecord) -> Result<PaymentSummary, ApiError> {
    Ok(PaymentSummary {
        status: payment_status(&record)?,
        id: record.id,
        amount: Amount::from_cents(record.amount),
    })
}

pub fn payment_info(record: PaymentRecord, currency: &str) -> Result<PaymentInfo, ApiError> {
    Ok(PaymentInfo {
        status: payment_status(&record)?,
        id: record.id,
        amount: Amount::from_cents(record.amount),
        currency: currency.to_string(),
        created_at: record.created_at,
    })
}

pub fn lender_payment_info(
    record: PaymentRecord,
    currency: &str,
    borrower: User,
    borrower_record: &BorrowerRecord,
) -> Result<LenderPaymentInfo, ApiError> {
    Ok(LenderPaymentInfo {
        status: payment_status(&record)?,
        id: record.id,
        amount: Amount::from_cents(record.amount),
        currency: currency.to_string(),
        created_at: record.created_at,
        borrower: user_info(borrower),
        borrower_balance: Amount::from_cents(borrower_record.balance),
    })
}

/// Assembles the full debt view: the record itself, its lender, and
/// every borrower with their payments.
pub fn debt_info(conn: &mut SqliteConnection, record: DebtRecord) -> Result<DebtInfo, ApiError> {
    let lender = db::get_user(conn, &record.lender_id)?
        .ok_or_else(|| ApiError::internal(format!("Lender '{}' not found", record.lender_id)))?;

    let mut borrowers = Vec::new();

    for (borrower, user) in db::list_borrowers(conn, &record.id)? {
        let payments = db::borrower_payments(conn, &record.id, &borrower.user_id)?
            .into_iter()
            .map(payment_summary)
            .collect::<Result<Vec<_>, _>>()?;

        borrowers.push(BorrowerInfo {
            user: user_info(user),
            balance: Amount::from_cents(borrower.balance),
            payments,
        });
    }

    let recurring_frequency = record
        .recurring_frequency
        .as_deref()
        .map(|s| {
            RecurringFrequency::parse(s)
                .ok_or_else(|| ApiError::internal(format!("Unknown frequency '{s}'")))
        })
        .transpose()?;

    Ok(DebtInfo {
        id: record.id,
        name: record.name,
        description: record.description,
        amount: Amount::from_cents(record.amount),
        currency: record.currency,
        due_date: record.due_date,
        recurring_frequency,
        cycles: record.duration,
        archived_at: record.archived_at,
        created_at: record.created_at,
        lender: user_info(lender),
        borrowers,
    })
}
