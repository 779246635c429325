use diesel::{AsChangeset, Insertable, Queryable, Selectable};

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::user)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: i64,
}

/// Profile refresh on repeat sign-in. `None` fields are left untouched
/// rather than written as NULL.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::user)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::debt)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DebtRecord {
    pub id: String,
    pub lender_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub due_date: Option<i64>,
    pub recurring_frequency: Option<String>,
    pub duration: Option<i64>,
    pub archived_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::borrower)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BorrowerRecord {
    pub user_id: String,
    pub debt_id: String,
    pub balance: i64,
    pub created_at: i64,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::pending_invite)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InviteRecord {
    pub debt_id: String,
    pub invitee_email: String,
    pub inviter_id: String,
    pub created_at: i64,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::payment)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaymentRecord {
    pub id: String,
    pub debt_id: String,
    pub borrower_id: String,
    pub amount: i64,
    pub status: String,
    pub created_at: i64,
}
