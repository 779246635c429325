use serde::{Deserialize, Serialize};

use tally_core::money::Amount;

pub const ROUTE_DEBT_CREATE: &str = "/debt/create";
pub const ROUTE_DEBT_ARCHIVE: &str = "/debt/archive";
pub const ROUTE_DEBT_LENDER_LIST: &str = "/debt/lender-list";
pub const ROUTE_DEBT_BORROWER_LIST: &str = "/debt/borrower-list";
pub const ROUTE_DEBT_PARTNERS: &str = "/debt/partners";
pub const ROUTE_DEBT_MEMBERS: &str = "/debt/members";
pub const ROUTE_INVITE_SEND: &str = "/invite/send";
pub const ROUTE_INVITE_REMOVE: &str = "/invite/remove";
pub const ROUTE_PAYMENT_ADD: &str = "/payment/add";
pub const ROUTE_PAYMENT_REMOVE: &str = "/payment/remove";
pub const ROUTE_PAYMENT_CONFIRM: &str = "/payment/confirm";
pub const ROUTE_PAYMENT_BORROWER_LIST: &str = "/payment/borrower-list";
pub const ROUTE_PAYMENT_LENDER_LIST: &str = "/payment/lender-list";

/// Maximum number of accepted borrowers plus pending invites per debt.
pub const DEBT_MAX_BORROWERS: usize = 4;

/// Fixed page size for the debt list queries.
pub const DEBTS_PAGE_SIZE: usize = 8;

pub const DEBT_MAX_NAME_CHARS: usize = 50;
pub const DEBT_MAX_DESCRIPTION_CHARS: usize = 100;

/// Amount bounds in cents: 1.00 up to 1,000,000,000.00.
pub const DEBT_MIN_AMOUNT_CENTS: i64 = 100;
pub const DEBT_MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

pub const DEBT_MAX_WEEKLY_CYCLES: i64 = 8;
pub const DEBT_MAX_BIWEEKLY_CYCLES: i64 = 6;
pub const DEBT_MAX_MONTHLY_CYCLES: i64 = 12;

/// Currencies accepted for new debts.
pub const CURRENCIES: [&str; 11] = [
    "COP", "USD", "MXN", "EUR", "UYU", "ARS", "CLP", "BRL", "PYG", "PEN", "GBP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    PendingConfirmation,
    Paid,
    Missed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::PendingConfirmation => "PENDING_CONFIRMATION",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Missed => "MISSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING_CONFIRMATION" => Some(PaymentStatus::PendingConfirmation),
            "PAID" => Some(PaymentStatus::Paid),
            "MISSED" => Some(PaymentStatus::Missed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurringFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurringFrequency::Weekly => "WEEKLY",
            RecurringFrequency::Biweekly => "BIWEEKLY",
            RecurringFrequency::Monthly => "MONTHLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEKLY" => Some(RecurringFrequency::Weekly),
            "BIWEEKLY" => Some(RecurringFrequency::Biweekly),
            "MONTHLY" => Some(RecurringFrequency::Monthly),
            _ => None,
        }
    }

    /// Cap on the number of cycles for this frequency.
    pub fn max_cycles(self) -> i64 {
        match self {
            RecurringFrequency::Weekly => DEBT_MAX_WEEKLY_CYCLES,
            RecurringFrequency::Biweekly => DEBT_MAX_BIWEEKLY_CYCLES,
            RecurringFrequency::Monthly => DEBT_MAX_MONTHLY_CYCLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LenderDebtStatus {
    Active,
    Archived,
    All,
    PendingConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowerDebtStatus {
    Active,
    Archived,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerRole {
    Lender,
    Borrower,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    /// The user's stable ledger id
    pub id: String,
    /// The user's verified email
    pub email: String,
    /// The user's display name
    pub name: Option<String>,
    /// URL of the user's avatar image
    pub image: Option<String>,
}

/// Repayment terms, fixed at creation: a debt is either a one-off with
/// an optional due date or a recurring obligation, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebtTerms {
    Single {
        /// Optional due date as an RFC 3339 timestamp
        due_date: Option<String>,
    },
    Recurrent {
        /// How often a cycle comes due
        frequency: RecurringFrequency,
        /// Total number of cycles, at least 2
        cycles: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtGeneralInfo {
    /// Display name of the debt
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Total amount owed per borrower
    pub amount: Amount,
    /// ISO-like currency code from the allow-list
    pub currency: String,
    /// Single or recurrent repayment terms
    pub terms: DebtTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDebtRequest {
    pub general_info: DebtGeneralInfo,
    /// Emails to invite as borrowers, deduplicated, 1 to 4 entries
    pub borrower_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSummary {
    /// The payment id
    pub id: String,
    /// The payment status
    pub status: PaymentStatus,
    /// The payment amount
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BorrowerInfo {
    /// The borrowing user
    pub user: UserInfo,
    /// Remaining amount this borrower owes
    pub balance: Amount,
    /// This borrower's payments on the debt
    pub payments: Vec<PaymentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtInfo {
    /// The debt id
    pub id: String,
    /// Display name of the debt
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Total amount owed per borrower
    pub amount: Amount,
    /// Currency code
    pub currency: String,
    /// Due date in milliseconds since epoch, single debts only
    pub due_date: Option<i64>,
    /// Recurrence frequency, recurrent debts only
    pub recurring_frequency: Option<RecurringFrequency>,
    /// Number of recurrence cycles, recurrent debts only
    pub cycles: Option<i64>,
    /// When the debt was archived, null while active
    pub archived_at: Option<i64>,
    /// When the debt was created
    pub created_at: i64,
    /// The lender who owns the debt
    pub lender: UserInfo,
    /// Accepted borrowers with their balances and payments
    pub borrowers: Vec<BorrowerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDebtRequest {
    /// The debt to archive
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveDebtResponse {
    /// The archived debt's id
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLenderDebtsRequest {
    /// Page offset in rows, not pages
    pub skip: usize,
    /// Status filter
    pub status: LenderDebtStatus,
    /// Sort direction by creation time
    pub sort: SortDirection,
    /// Only debts with this counterparty
    pub partner_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBorrowerDebtsRequest {
    /// Page offset in rows, not pages
    pub skip: usize,
    /// Status filter
    pub status: BorrowerDebtStatus,
    /// Sort direction by creation time
    pub sort: SortDirection,
    /// Only debts with this counterparty
    pub partner_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDebtsResponse {
    /// One page of debts
    pub debts: Vec<DebtInfo>,
    /// Total number of debts matching the filter
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnersRequest {
    /// Which side of the ledger the caller is asking about
    pub role: PartnerRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartnerInfo {
    /// The counterparty's email
    pub email: String,
    /// The counterparty's display name
    pub name: Option<String>,
    /// URL of the counterparty's avatar image
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnersResponse {
    /// Distinct counterparties across all of the caller's debts
    pub partners: Vec<PartnerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtMembersRequest {
    /// The debt to inspect
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtMember {
    /// The borrowing user
    pub user: UserInfo,
    /// Remaining amount this borrower owes
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtMembersResponse {
    /// Accepted borrowers
    pub borrowers: Vec<DebtMember>,
    /// Emails with an outstanding invite
    pub pending_invites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendInviteRequest {
    /// The debt to invite to
    pub debt_id: String,
    /// Email address of the invitee
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendInviteResponse {
    /// Email address of the invitee
    pub invitee_email: String,
    /// The debt invited to
    pub debt_id: String,
    /// Display name of the debt
    pub debt_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveInviteRequest {
    /// The debt the invite belongs to
    pub debt_id: String,
    /// Email address the invite was sent to
    pub invitee_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveInviteResponse {
    /// The debt the invite belonged to
    pub debt_id: String,
    /// Email address the invite was sent to
    pub invitee_email: String,
}

/// How much of the balance a payment covers. A full payment always
/// settles the borrower's entire remaining balance and carries no
/// client-supplied amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaymentAmount {
    Full,
    Partial {
        /// Amount to pay, must not exceed the remaining balance
        amount: Amount,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPaymentRequest {
    /// The debt being paid
    pub debt_id: String,
    /// Full or partial payment
    #[serde(flatten)]
    pub payment: PaymentAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddPaymentResponse {
    /// Id of the recorded payment
    pub payment_id: String,
    /// The borrower's balance after the payment
    pub new_balance: Amount,
    /// The resolved payment amount
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovePaymentRequest {
    /// The payment to retract
    pub payment_id: String,
    /// The debt the payment belongs to
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovePaymentResponse {
    /// The retracted payment's id
    pub payment_id: String,
    /// The debt the payment belonged to
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    /// The debt the payment belongs to
    pub debt_id: String,
    /// The borrower who recorded the payment
    pub borrower_id: String,
    /// The payment to confirm
    pub payment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmPaymentResponse {
    /// The confirmed payment's id
    pub payment_id: String,
    /// The debt the payment belongs to
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPaymentsRequest {
    /// The debt to list payments for
    pub debt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfo {
    /// The payment id
    pub id: String,
    /// The payment status
    pub status: PaymentStatus,
    /// The payment amount
    pub amount: Amount,
    /// Currency code of the debt
    pub currency: String,
    /// When the payment was recorded
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerPaymentsResponse {
    /// The caller's payments on the debt
    pub payments: Vec<PaymentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LenderPaymentInfo {
    /// The payment id
    pub id: String,
    /// The payment status
    pub status: PaymentStatus,
    /// The payment amount
    pub amount: Amount,
    /// Currency code of the debt
    pub currency: String,
    /// When the payment was recorded
    pub created_at: i64,
    /// The borrower who recorded the payment
    pub borrower: UserInfo,
    /// The borrower's current balance on the debt
    pub borrower_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LenderPaymentsResponse {
    /// All payments on the debt, across borrowers
    pub payments: Vec<LenderPaymentInfo>,
}
