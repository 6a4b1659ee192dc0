use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db,
    error::ApiError,
    identity::IdentityField,
    models::{ReviewRow, ServiceRow, STATUS_PENDING},
    slots::{self, BUSINESS_HOURS},
    state::AppState,
};

#[derive(Deserialize)]
struct SlotQuery {
    date: String,
    // Sent by the booking form; availability is per-slot, not per-service.
    #[allow(dead_code)]
    service_id: Option<i32>,
}

#[derive(Deserialize)]
struct BookingPayload {
    client_name: String,
    client_phone: String,
    client_cpf: Option<String>,
    client_email: Option<String>,
    service_id: Option<i32>,
    appointment_date: String,
    appointment_time: String,
}

#[derive(Deserialize)]
struct ReviewPayload {
    client_name: Option<String>,
    client_phone: Option<String>,
    client_cpf: Option<String>,
    rating: Option<i32>,
    comment: Option<String>,
}

#[derive(Deserialize)]
struct ReviewUpdatePayload {
    client_name: Option<String>,
    rating: Option<i32>,
    comment: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/api/services").route(web::get().to(list_services)))
        .service(web::resource("/api/available-slots").route(web::get().to(available_slots)))
        .service(web::resource("/api/today-slots").route(web::get().to(today_slots)))
        .service(web::resource("/api/appointments").route(web::post().to(create_appointment)))
        .service(
            web::resource("/api/reviews")
                .route(web::get().to(list_reviews))
                .route(web::post().to(create_review)),
        )
        .service(web::resource("/api/reviews/check/{identity}").route(web::get().to(check_review)))
        .service(web::resource("/api/reviews/{identity}").route(web::put().to(update_review)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let services = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, description, price, duration, active,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM services
           WHERE active = true
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn available_slots(
    state: web::Data<AppState>,
    query: web::Query<SlotQuery>,
) -> Result<HttpResponse, ApiError> {
    let booked = db::booked_times(&state.db, &query.date).await?;
    let open = slots::available_slots(&BUSINESS_HOURS, &query.date, &booked, slots::salon_now());
    Ok(HttpResponse::Ok().json(open))
}

async fn today_slots(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let today = slots::salon_today();
    let booked = db::booked_times(&state.db, &today).await?;
    let open = slots::available_slots(&BUSINESS_HOURS, &today, &booked, slots::salon_now());
    let available = open.len();
    Ok(HttpResponse::Ok().json(json!({
        "date": today,
        "slots": open,
        "total": BUSINESS_HOURS.len(),
        "available": available,
    })))
}

async fn create_appointment(
    state: web::Data<AppState>,
    payload: web::Json<BookingPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    if db::slot_taken(&state.db, &payload.appointment_date, &payload.appointment_time).await? {
        return Err(ApiError::Conflict("Time slot not available"));
    }

    let id = sqlx::query_scalar::<_, i32>(
        r#"INSERT INTO online_appointments
               (client_name, client_cpf, client_phone, client_email, service_id,
                appointment_date, appointment_time, status)
           VALUES ($1, $2, $3, $4, $5, $6::date, $7::time, $8)
           RETURNING id"#,
    )
    .bind(&payload.client_name)
    .bind(payload.client_cpf.as_deref().unwrap_or(""))
    .bind(&payload.client_phone)
    .bind(&payload.client_email)
    .bind(payload.service_id)
    .bind(&payload.appointment_date)
    .bind(&payload.appointment_time)
    .bind(STATUS_PENDING)
    .fetch_one(&state.db)
    .await
    .map_err(|err| ApiError::conflict_on_unique(err, "Time slot not available"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

async fn list_reviews(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reviews = sqlx::query_as::<_, ReviewRow>(
        r#"SELECT id, client_name, rating, comment,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM reviews
           WHERE approved = true
           ORDER BY created_at DESC
           LIMIT 50"#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(reviews))
}

async fn check_review(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let field = state.config.review_identity;
    let identity = field
        .normalize(&path.into_inner())
        .ok_or(ApiError::Validation(field.invalid_message()))?;

    let review = sqlx::query_as::<_, ReviewRow>(
        r#"SELECT id, client_name, rating, comment,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM reviews
           WHERE client_identity = $1"#,
    )
    .bind(&identity)
    .fetch_optional(&state.db)
    .await?;

    match review {
        Some(review) => Ok(HttpResponse::Ok().json(json!({ "hasReview": true, "review": review }))),
        None => Ok(HttpResponse::Ok().json(json!({ "hasReview": false }))),
    }
}

async fn create_review(
    state: web::Data<AppState>,
    payload: web::Json<ReviewPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let field = state.config.review_identity;

    let name = payload
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::Validation("Name, contact and rating are required"))?;
    let raw_identity = match field {
        IdentityField::Phone => payload.client_phone.as_deref(),
        IdentityField::TaxId => payload.client_cpf.as_deref(),
    }
    .ok_or(ApiError::Validation("Name, contact and rating are required"))?;
    let rating = payload
        .rating
        .filter(|rating| (1..=5).contains(rating))
        .ok_or(ApiError::Validation("Name, contact and rating are required"))?;
    let identity = field
        .normalize(raw_identity)
        .ok_or(ApiError::Validation(field.invalid_message()))?;

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM reviews WHERE client_identity = $1")
            .bind(&identity)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "You have already submitted a review. Use the edit option.",
        ));
    }

    let review = sqlx::query_as::<_, ReviewRow>(
        r#"INSERT INTO reviews (client_name, client_identity, rating, comment)
           VALUES ($1, $2, $3, $4)
           RETURNING id, client_name, rating, comment,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at"#,
    )
    .bind(name)
    .bind(&identity)
    .bind(rating)
    .bind(payload.comment.as_deref().unwrap_or(""))
    .fetch_one(&state.db)
    .await
    .map_err(|err| {
        ApiError::conflict_on_unique(err, "You have already submitted a review. Use the edit option.")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "review": review })))
}

async fn update_review(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReviewUpdatePayload>,
) -> Result<HttpResponse, ApiError> {
    let field = state.config.review_identity;
    let identity = field
        .normalize(&path.into_inner())
        .ok_or(ApiError::Validation(field.invalid_message()))?;

    let payload = payload.into_inner();
    let name = payload
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::Validation("Name and rating are required"))?;
    let rating = payload
        .rating
        .filter(|rating| (1..=5).contains(rating))
        .ok_or(ApiError::Validation("Name and rating are required"))?;

    // Edits bump created_at so the review resurfaces at the top of the list.
    let review = sqlx::query_as::<_, ReviewRow>(
        r#"UPDATE reviews
           SET client_name = $1, rating = $2, comment = $3, created_at = CURRENT_TIMESTAMP
           WHERE client_identity = $4
           RETURNING id, client_name, rating, comment,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at"#,
    )
    .bind(name)
    .bind(rating)
    .bind(payload.comment.as_deref().unwrap_or(""))
    .bind(&identity)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Review not found"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "review": review })))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use sqlx::PgPool;

    use crate::config::AppConfig;
    use crate::sessions::SessionStore;

    fn test_state(pool: PgPool) -> web::Data<AppState> {
        web::Data::new(AppState {
            db: pool,
            sessions: Arc::new(SessionStore::new()),
            config: AppConfig {
                database_url: String::new(),
                port: 0,
                require_tls: false,
                admin_password: "admin".into(),
                reveal_password: "reveal".into(),
                review_identity: IdentityField::Phone,
            },
        })
    }

    fn booking(date: &str, time: &str) -> web::Json<BookingPayload> {
        web::Json(BookingPayload {
            client_name: "Ana Souza".into(),
            client_phone: "(11) 98765-4321".into(),
            client_cpf: None,
            client_email: None,
            service_id: None,
            appointment_date: date.into(),
            appointment_time: time.into(),
        })
    }

    fn review(name: &str, phone: &str) -> web::Json<ReviewPayload> {
        web::Json(ReviewPayload {
            client_name: Some(name.into()),
            client_phone: Some(phone.into()),
            client_cpf: None,
            rating: Some(5),
            comment: Some("Beautiful work".into()),
        })
    }

    #[sqlx::test]
    async fn booking_a_taken_slot_is_rejected(pool: PgPool) {
        let state = test_state(pool);

        let first = create_appointment(state.clone(), booking("2031-05-20", "10:00"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = create_appointment(state, booking("2031-05-20", "10:00")).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));
    }

    #[sqlx::test]
    async fn walk_in_entries_block_online_booking(pool: PgPool) {
        sqlx::query(
            "INSERT INTO appointments (appointment_date, appointment_time)
             VALUES ('2031-05-20', '10:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let state = test_state(pool);
        let result = create_appointment(state, booking("2031-05-20", "10:00")).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[sqlx::test]
    async fn cancelled_bookings_free_their_slot(pool: PgPool) {
        sqlx::query(
            "INSERT INTO online_appointments
                 (client_name, client_cpf, client_phone, appointment_date, appointment_time, status)
             VALUES ('Ana Souza', '', '11987654321', '2031-05-20', '10:00', 'cancelled')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let state = test_state(pool);
        let response = create_appointment(state, booking("2031-05-20", "10:00"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test]
    async fn second_review_from_the_same_contact_is_rejected(pool: PgPool) {
        let state = test_state(pool);

        let first = create_review(state.clone(), review("Ana Souza", "(11) 98765-4321"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Same phone, different formatting. Normalization keys them together.
        let second = create_review(state, review("Ana S.", "11987654321")).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));
    }

    #[sqlx::test]
    async fn editing_a_review_nobody_wrote_is_not_found(pool: PgPool) {
        let state = test_state(pool);

        let result = update_review(
            state,
            web::Path::from("11987654321".to_string()),
            web::Json(ReviewUpdatePayload {
                client_name: Some("Ana Souza".into()),
                rating: Some(4),
                comment: None,
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
