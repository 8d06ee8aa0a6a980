use std::time::Duration;

use sea_orm::*;
use sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use tracing::{info, warn};

use crate::entity::{notification_delivery, registration};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Create the composite indexes that schema sync does not derive from the entities.
///
/// Failures are logged and skipped; the service works without them, only slower.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Admin listing: WHERE event_id = ? ORDER BY registered_at DESC
    create_index(
        db,
        "idx_registration_event_registered",
        Index::create()
            .table(registration::Entity)
            .col(registration::Column::EventId)
            .col(registration::Column::RegisteredAt)
            .to_owned(),
    )
    .await;

    // Retry sweeper: WHERE status IN (...) AND last_attempt_at < ?
    create_index(
        db,
        "idx_delivery_status_attempt",
        Index::create()
            .table(notification_delivery::Entity)
            .col(notification_delivery::Column::Status)
            .col(notification_delivery::Column::LastAttemptAt)
            .to_owned(),
    )
    .await;

    create_index(
        db,
        "idx_delivery_registration",
        Index::create()
            .table(notification_delivery::Entity)
            .col(notification_delivery::Column::RegistrationId)
            .to_owned(),
    )
    .await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, mut stmt: IndexCreateStatement) {
    let sql = stmt
        .if_not_exists()
        .name(name)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
