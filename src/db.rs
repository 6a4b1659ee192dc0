use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::from_str(&config.database_url)?;
    if config.require_tls {
        options = options.ssl_mode(PgSslMode::Require);
    }
    PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Seeds a starter service and product the first time the database comes up
/// empty, so a fresh install has something to book and something to count.
pub async fn seed_defaults(pool: &PgPool) -> Result<(), sqlx::Error> {
    let services: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;
    if services == 0 {
        sqlx::query(
            "INSERT INTO services (name, description, price, duration) VALUES ($1, $2, $3, $4)",
        )
        .bind("Classic Lash Extensions")
        .bind("One-by-one lash application with a natural finish.")
        .bind(Decimal::new(18000, 2))
        .bind(120)
        .execute(pool)
        .await?;
    }

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if products == 0 {
        sqlx::query(
            "INSERT INTO products (name, category, quantity, min_stock) VALUES ($1, $2, $3, $4)",
        )
        .bind("Silk Lashes 0.15 C")
        .bind("lashes")
        .bind(10)
        .bind(3)
        .execute(pool)
        .await?;
    }

    log::info!("Database ready");
    Ok(())
}

/// Times already taken on `date`, across online bookings and walk-in
/// entries, as HH:MM strings. Cancelled rows free their slot.
pub async fn booked_times(pool: &PgPool, date: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"SELECT to_char(appointment_time, 'HH24:MI') FROM online_appointments
           WHERE appointment_date = $1::date AND status <> 'cancelled'
           UNION
           SELECT to_char(appointment_time, 'HH24:MI') FROM appointments
           WHERE appointment_date = $1::date AND status <> 'cancelled'"#,
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

/// True when any live booking, online or walk-in, already holds the slot.
/// Both insert paths call this before writing.
pub async fn slot_taken(pool: &PgPool, date: &str, time: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
               SELECT 1 FROM online_appointments
               WHERE appointment_date = $1::date AND appointment_time = $2::time
                 AND status <> 'cancelled'
               UNION
               SELECT 1 FROM appointments
               WHERE appointment_date = $1::date AND appointment_time = $2::time
                 AND status <> 'cancelled')"#,
    )
    .bind(date)
    .bind(time)
    .fetch_one(pool)
    .await
}
