use diesel::{
    ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl, QueryResult, RunQueryDsl,
    SelectableHelper, SqliteConnection,
};

use tally_api_core::PaymentStatus;
use tally_core::{new_id, unix_time};
use tally_daemon_db::models::{
    BorrowerRecord, DebtRecord, InviteRecord, PaymentRecord, User, UserUpdate,
};
use tally_daemon_db::schema::{borrower, debt, payment, pending_invite, user};

/// Creates the user on first sight and refreshes name and image after,
/// keyed by the verified email. Absent profile fields are kept, not
/// overwritten, so a request without them does not erase the profile.
pub fn upsert_user(
    conn: &mut SqliteConnection,
    email: &str,
    name: Option<String>,
    image: Option<String>,
) -> QueryResult<User> {
    let record = User {
        id: new_id(),
        email: email.to_string(),
        name: name.clone(),
        image: image.clone(),
        created_at: unix_time(),
    };

    let insert = diesel::insert_into(user::table)
        .values(&record)
        .on_conflict(user::email);

    // An all-None changeset is an error in diesel, so skip the update
    // entirely when there is nothing to refresh.
    if name.is_some() || image.is_some() {
        insert
            .do_update()
            .set(&UserUpdate { name, image })
            .execute(conn)?;
    } else {
        insert.do_nothing().execute(conn)?;
    }

    user::table.filter(user::email.eq(email)).first::<User>(conn)
}

pub fn get_user(conn: &mut SqliteConnection, user_id: &str) -> QueryResult<Option<User>> {
    user::table
        .filter(user::id.eq(user_id))
        .first::<User>(conn)
        .optional()
}

pub fn get_debt(conn: &mut SqliteConnection, debt_id: &str) -> QueryResult<Option<DebtRecord>> {
    debt::table
        .filter(debt::id.eq(debt_id))
        .first::<DebtRecord>(conn)
        .optional()
}

/// Ownership is folded into the lookup so a caller cannot tell a
/// foreign debt from a missing one.
pub fn get_debt_for_lender(
    conn: &mut SqliteConnection,
    debt_id: &str,
    lender_id: &str,
) -> QueryResult<Option<DebtRecord>> {
    debt::table
        .filter(debt::id.eq(debt_id))
        .filter(debt::lender_id.eq(lender_id))
        .first::<DebtRecord>(conn)
        .optional()
}

pub fn get_borrower(
    conn: &mut SqliteConnection,
    user_id: &str,
    debt_id: &str,
) -> QueryResult<Option<BorrowerRecord>> {
    borrower::table
        .filter(borrower::user_id.eq(user_id))
        .filter(borrower::debt_id.eq(debt_id))
        .first::<BorrowerRecord>(conn)
        .optional()
}

pub fn list_borrowers(
    conn: &mut SqliteConnection,
    debt_id: &str,
) -> QueryResult<Vec<(BorrowerRecord, User)>> {
    borrower::table
        .inner_join(user::table.on(borrower::user_id.eq(user::id)))
        .filter(borrower::debt_id.eq(debt_id))
        .load::<(BorrowerRecord, User)>(conn)
}

pub fn set_borrower_balance(
    conn: &mut SqliteConnection,
    user_id: &str,
    debt_id: &str,
    balance: i64,
) -> QueryResult<usize> {
    diesel::update(
        borrower::table
            .filter(borrower::user_id.eq(user_id))
            .filter(borrower::debt_id.eq(debt_id)),
    )
    .set(borrower::balance.eq(balance))
    .execute(conn)
}

pub fn list_invites(
    conn: &mut SqliteConnection,
    debt_id: &str,
) -> QueryResult<Vec<InviteRecord>> {
    pending_invite::table
        .filter(pending_invite::debt_id.eq(debt_id))
        .load::<InviteRecord>(conn)
}

pub fn create_invite(conn: &mut SqliteConnection, record: &InviteRecord) -> QueryResult<usize> {
    diesel::insert_into(pending_invite::table)
        .values(record)
        .execute(conn)
}

pub fn create_invites(
    conn: &mut SqliteConnection,
    records: &[InviteRecord],
) -> QueryResult<usize> {
    diesel::insert_into(pending_invite::table)
        .values(records)
        .execute(conn)
}

pub fn delete_invite(
    conn: &mut SqliteConnection,
    debt_id: &str,
    invitee_email: &str,
    inviter_id: &str,
) -> QueryResult<usize> {
    diesel::delete(
        pending_invite::table
            .filter(pending_invite::debt_id.eq(debt_id))
            .filter(pending_invite::invitee_email.eq(invitee_email))
            .filter(pending_invite::inviter_id.eq(inviter_id)),
    )
    .execute(conn)
}

pub fn delete_debt_invites(conn: &mut SqliteConnection, debt_id: &str) -> QueryResult<usize> {
    diesel::delete(pending_invite::table.filter(pending_invite::debt_id.eq(debt_id)))
        .execute(conn)
}

pub fn create_debt(conn: &mut SqliteConnection, record: &DebtRecord) -> QueryResult<usize> {
    diesel::insert_into(debt::table).values(record).execute(conn)
}

/// Stamps the archive time on the debt if the caller owns it and it is
/// still active. Returns the number of rows touched, zero meaning
/// missing, foreign or already archived.
pub fn archive_debt(
    conn: &mut SqliteConnection,
    debt_id: &str,
    lender_id: &str,
    archived_at: i64,
) -> QueryResult<usize> {
    diesel::update(
        debt::table
            .filter(debt::id.eq(debt_id))
            .filter(debt::lender_id.eq(lender_id))
            .filter(debt::archived_at.is_null()),
    )
    .set(debt::archived_at.eq(archived_at))
    .execute(conn)
}

pub fn lender_debts(conn: &mut SqliteConnection, lender_id: &str) -> QueryResult<Vec<DebtRecord>> {
    debt::table
        .filter(debt::lender_id.eq(lender_id))
        .load::<DebtRecord>(conn)
}

pub fn borrower_debts(conn: &mut SqliteConnection, user_id: &str) -> QueryResult<Vec<DebtRecord>> {
    let debt_ids = borrower::table
        .filter(borrower::user_id.eq(user_id))
        .select(borrower::debt_id)
        .load::<String>(conn)?;

    debt::table
        .filter(debt::id.eq_any(debt_ids))
        .load::<DebtRecord>(conn)
}

/// Users borrowing on any debt owned by the given lender.
pub fn lender_partner_users(
    conn: &mut SqliteConnection,
    lender_id: &str,
) -> QueryResult<Vec<User>> {
    borrower::table
        .inner_join(debt::table.on(borrower::debt_id.eq(debt::id)))
        .inner_join(user::table.on(borrower::user_id.eq(user::id)))
        .filter(debt::lender_id.eq(lender_id))
        .select(User::as_select())
        .load::<User>(conn)
}

/// Lenders of any debt the given user borrows on.
pub fn borrower_partner_users(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> QueryResult<Vec<User>> {
    borrower::table
        .inner_join(debt::table.on(borrower::debt_id.eq(debt::id)))
        .inner_join(user::table.on(debt::lender_id.eq(user::id)))
        .filter(borrower::user_id.eq(user_id))
        .select(User::as_select())
        .load::<User>(conn)
}

pub fn get_payment(
    conn: &mut SqliteConnection,
    payment_id: &str,
) -> QueryResult<Option<PaymentRecord>> {
    payment::table
        .filter(payment::id.eq(payment_id))
        .first::<PaymentRecord>(conn)
        .optional()
}

pub fn insert_payment(conn: &mut SqliteConnection, record: &PaymentRecord) -> QueryResult<usize> {
    diesel::insert_into(payment::table)
        .values(record)
        .execute(conn)
}

pub fn delete_payment(conn: &mut SqliteConnection, payment_id: &str) -> QueryResult<usize> {
    diesel::delete(payment::table.filter(payment::id.eq(payment_id))).execute(conn)
}

/// Conditional confirmation, re-filtered by the full identifying tuple
/// so a payment that changed state since it was checked matches zero
/// rows instead of being overwritten.
pub fn confirm_payment(
    conn: &mut SqliteConnection,
    payment_id: &str,
    debt_id: &str,
    borrower_id: &str,
) -> QueryResult<usize> {
    diesel::update(
        payment::table
            .filter(payment::id.eq(payment_id))
            .filter(payment::debt_id.eq(debt_id))
            .filter(payment::borrower_id.eq(borrower_id))
            .filter(payment::status.eq(PaymentStatus::PendingConfirmation.as_str())),
    )
    .set(payment::status.eq(PaymentStatus::Paid.as_str()))
    .execute(conn)
}

pub fn debt_payments(
    conn: &mut SqliteConnection,
    debt_id: &str,
) -> QueryResult<Vec<PaymentRecord>> {
    payment::table
        .filter(payment::debt_id.eq(debt_id))
        .order_by(payment::created_at.asc())
        .load::<PaymentRecord>(conn)
}

pub fn borrower_payments(
    conn: &mut SqliteConnection,
    debt_id: &str,
    borrower_id: &str,
) -> QueryResult<Vec<PaymentRecord>> {
    payment::table
        .filter(payment::debt_id.eq(debt_id))
        .filter(payment::borrower_id.eq(borrower_id))
        .order_by(payment::created_at.asc())
        .load::<PaymentRecord>(conn)
}
