use sqlx::PgPool;
use uuid::Uuid;

/// Record a user mutation. Called explicitly by handlers after the write
/// succeeded; a failed insert is logged and never fails the request.
pub async fn log_user_event(
    pool: &PgPool,
    organisation: &str,
    actor: Option<Uuid>,
    action: &str,
    user_id: Uuid,
    details: Option<serde_json::Value>,
) {
    if let Err(e) = crate::db::audit::log_event(
        pool,
        organisation,
        actor,
        action,
        "user",
        Some(user_id),
        details,
    )
    .await
    {
        tracing::error!("Failed to log audit event {action}: {e}");
    }
}
