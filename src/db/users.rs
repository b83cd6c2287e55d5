use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Availability, User, UserFilter, UserPatch, UserStats, UserStatus};

const ORDER_BY_LAST_LOGIN: &str = " ORDER BY last_login_at DESC NULLS LAST, created_at";

pub async fn create(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    organisation: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password_hash, organisation, status, availability)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(organisation)
    .bind(UserStatus::Active.as_str())
    .bind(Availability::Available.as_str())
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Unscoped lookup, only for resolving the authenticated principal.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_in_organisation(
    pool: &PgPool,
    organisation: &str,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND organisation = $2")
        .bind(id)
        .bind(organisation)
        .fetch_optional(pool)
        .await
}

pub async fn list_available(pool: &PgPool, organisation: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE organisation = $1 AND availability <> $2
         ORDER BY last_login_at DESC NULLS LAST, created_at",
    )
    .bind(organisation)
    .bind(Availability::NotAvailable.as_str())
    .fetch_all(pool)
    .await
}

pub async fn list_filtered(
    pool: &PgPool,
    organisation: &str,
    filter: &UserFilter,
) -> Result<Vec<User>, sqlx::Error> {
    let mut builder = filter_query(organisation, filter);
    builder.build_query_as::<User>().fetch_all(pool).await
}

/// Builds the list query. The organisation predicate always comes from the
/// caller, never from `filter.organisation`.
fn filter_query<'a>(organisation: &'a str, filter: &'a UserFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE organisation = ");
    builder.push_bind(organisation);

    if let Some(name) = &filter.name {
        builder.push(" AND name = ");
        builder.push_bind(name.as_str());
    }

    // Stored emails are trimmed and lowercased.
    if let Some(email) = &filter.email {
        builder.push(" AND email = ");
        builder.push_bind(email.trim().to_lowercase());
    }

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }

    if let Some(availability) = filter.availability {
        builder.push(" AND availability = ");
        builder.push_bind(availability.as_str());
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", escape_like(search.trim()));
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(ORDER_BY_LAST_LOGIN);
    builder
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Merge-update within an organisation. Returns `None` when no row matched.
pub async fn update_in_organisation(
    pool: &PgPool,
    organisation: &str,
    id: Uuid,
    patch: &UserPatch,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            name = COALESCE($3, name),
            email = COALESCE($4, email),
            password_hash = COALESCE($5, password_hash),
            status = COALESCE($6, status),
            availability = COALESCE($7, availability),
            last_login_at = COALESCE($8, last_login_at),
            updated_at = now()
         WHERE id = $1 AND organisation = $2
         RETURNING *",
    )
    .bind(id)
    .bind(organisation)
    .bind(patch.name.as_deref())
    .bind(patch.email.as_deref())
    .bind(patch.password_hash.as_deref())
    .bind(patch.status.map(|s| s.as_str()))
    .bind(patch.availability.map(|a| a.as_str()))
    .bind(patch.last_login_at)
    .fetch_optional(pool)
    .await
}

/// Stamps `last_login_at`. `updated_at` is left alone, a sign-in is not an
/// edit of the profile. Returns `None` if the user no longer exists.
pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("UPDATE users SET last_login_at = now() WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Hard delete. Returns the number of rows removed (0 or 1).
pub async fn delete_in_organisation(
    pool: &PgPool,
    organisation: &str,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1 AND organisation = $2")
        .bind(id)
        .bind(organisation)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn stats(pool: &PgPool, organisation: &str) -> Result<UserStats, sqlx::Error> {
    let (total, active, available): (i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status = $2),
            COUNT(*) FILTER (WHERE availability = $3)
         FROM users WHERE organisation = $1",
    )
    .bind(organisation)
    .bind(UserStatus::Active.as_str())
    .bind(Availability::Available.as_str())
    .fetch_one(pool)
    .await?;
    Ok(UserStats::from_counts(total, active, available))
}
