use actix_files::NamedFile;
use actix_web::{web, HttpResponse, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db,
    error::ApiError,
    masking::{mask_cpf, mask_phone},
    models::{
        ClientAppointmentRow, ClientRow, ClientSaleRow, OnlineAppointmentRow, ProductRow,
        SaleRow, ServiceRow, WalkInAppointmentRow, STATUS_CANCELLED, STATUS_CONFIRMED,
        STATUS_SCHEDULED,
    },
    slots,
    state::AppState,
};

/// Listings take an optional `?token=` and unmask PII only while that token
/// holds a live reveal grant.
#[derive(Deserialize)]
struct RevealQuery {
    token: Option<String>,
}

#[derive(Deserialize)]
struct ServicePayload {
    name: String,
    description: Option<String>,
    price: Decimal,
    duration: i32,
}

#[derive(Deserialize)]
struct ClientPayload {
    name: String,
    phone: String,
    cpf: Option<String>,
    email: Option<String>,
    birthdate: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct WalkInPayload {
    client_id: Option<i32>,
    service_id: Option<i32>,
    appointment_date: String,
    appointment_time: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct SalePayload {
    client_id: Option<i32>,
    service_id: Option<i32>,
    value: Decimal,
    payment_method: String,
    sale_date: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct ProductPayload {
    name: String,
    category: Option<String>,
    quantity: Option<i32>,
    min_stock: Option<i32>,
}

#[derive(Deserialize)]
struct StockPayload {
    delta: i32,
}

#[derive(Serialize)]
struct OnlineAppointmentView {
    id: i32,
    client_name: String,
    client_cpf: String,
    client_phone: String,
    client_email: Option<String>,
    service_id: Option<i32>,
    appointment_date: String,
    appointment_time: String,
    status: String,
    reminder_sent: bool,
    created_at: String,
    confirmed_at: Option<String>,
    cancelled_at: Option<String>,
    service_name: Option<String>,
    service_price: Option<Decimal>,
}

#[derive(Serialize)]
struct WalkInAppointmentView {
    id: i32,
    client_id: Option<i32>,
    service_id: Option<i32>,
    appointment_date: String,
    appointment_time: String,
    notes: Option<String>,
    status: String,
    created_at: String,
    client_name: Option<String>,
    client_phone: Option<String>,
    client_cpf: Option<String>,
    service_name: Option<String>,
}

#[derive(Serialize)]
struct ClientView {
    id: i32,
    name: String,
    phone: String,
    cpf: Option<String>,
    email: Option<String>,
    birthdate: Option<String>,
    notes: Option<String>,
    created_at: String,
}

/// History uses `*_display` keys so the client card renders the same fields
/// whether masked or revealed.
#[derive(Serialize)]
struct ClientHistoryView {
    id: i32,
    name: String,
    email: Option<String>,
    birthdate: Option<String>,
    notes: Option<String>,
    created_at: String,
    cpf_display: Option<String>,
    phone_display: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    today_appointments: i64,
    month_revenue: f64,
    total_clients: i64,
    month_sales: i64,
    pending_appointments: i64,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/admin").route(web::get().to(admin_page)))
        .service(
            web::scope("/api/admin")
                .service(
                    web::resource("/services")
                        .route(web::get().to(list_services))
                        .route(web::post().to(create_service)),
                )
                .service(web::resource("/services/{id}").route(web::delete().to(delete_service)))
                .service(
                    web::resource("/online-appointments")
                        .route(web::get().to(list_online_appointments)),
                )
                .service(
                    web::resource("/online-appointments/{id}/confirm")
                        .route(web::put().to(confirm_online_appointment)),
                )
                .service(
                    web::resource("/online-appointments/{id}/cancel")
                        .route(web::put().to(cancel_online_appointment)),
                )
                .service(
                    web::resource("/online-appointments/{id}/reminder-sent")
                        .route(web::put().to(mark_reminder_sent)),
                )
                .service(web::resource("/reminders").route(web::get().to(list_reminders)))
                .service(
                    web::resource("/clients")
                        .route(web::get().to(list_clients))
                        .route(web::post().to(create_client)),
                )
                .service(web::resource("/clients/{id}").route(web::delete().to(delete_client)))
                .service(web::resource("/clients/{id}/history").route(web::get().to(client_history)))
                .service(
                    web::resource("/appointments")
                        .route(web::get().to(list_appointments))
                        .route(web::post().to(create_appointment)),
                )
                .service(
                    web::resource("/appointments/{id}").route(web::delete().to(delete_appointment)),
                )
                .service(
                    web::resource("/sales")
                        .route(web::get().to(list_sales))
                        .route(web::post().to(create_sale)),
                )
                .service(web::resource("/sales/{id}").route(web::delete().to(delete_sale)))
                .service(
                    web::resource("/products")
                        .route(web::get().to(list_products))
                        .route(web::post().to(create_product)),
                )
                .service(web::resource("/products/{id}/stock").route(web::put().to(adjust_stock)))
                .service(web::resource("/products/{id}").route(web::delete().to(delete_product)))
                .service(web::resource("/stats").route(web::get().to(stats)))
                .service(web::resource("/reviews/{id}").route(web::delete().to(delete_review)))
                .service(web::resource("/get-phone/{kind}/{id}").route(web::get().to(get_phone))),
        );
}

async fn admin_page() -> Result<NamedFile> {
    Ok(NamedFile::open("./public/admin.html")?)
}

fn reveal_requested(state: &AppState, query: &RevealQuery) -> bool {
    query
        .token
        .as_deref()
        .map(|token| state.sessions.should_reveal(token))
        .unwrap_or(false)
}

fn online_view(row: OnlineAppointmentRow, reveal: bool) -> OnlineAppointmentView {
    let client_cpf = if reveal { row.client_cpf } else { mask_cpf(&row.client_cpf) };
    let client_phone = if reveal { row.client_phone } else { mask_phone(&row.client_phone) };
    OnlineAppointmentView {
        id: row.id,
        client_name: row.client_name,
        client_cpf,
        client_phone,
        client_email: row.client_email,
        service_id: row.service_id,
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        status: row.status,
        reminder_sent: row.reminder_sent,
        created_at: row.created_at,
        confirmed_at: row.confirmed_at,
        cancelled_at: row.cancelled_at,
        service_name: row.service_name,
        service_price: row.service_price,
    }
}

fn walk_in_view(row: WalkInAppointmentRow, reveal: bool) -> WalkInAppointmentView {
    let client_cpf = row
        .client_cpf
        .map(|cpf| if reveal { cpf } else { mask_cpf(&cpf) });
    let client_phone = row
        .client_phone
        .map(|phone| if reveal { phone } else { mask_phone(&phone) });
    WalkInAppointmentView {
        id: row.id,
        client_id: row.client_id,
        service_id: row.service_id,
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        notes: row.notes,
        status: row.status,
        created_at: row.created_at,
        client_name: row.client_name,
        client_phone,
        client_cpf,
        service_name: row.service_name,
    }
}

fn client_view(row: ClientRow, reveal: bool) -> ClientView {
    let cpf = row.cpf.map(|cpf| if reveal { cpf } else { mask_cpf(&cpf) });
    let phone = if reveal { row.phone } else { mask_phone(&row.phone) };
    ClientView {
        id: row.id,
        name: row.name,
        phone,
        cpf,
        email: row.email,
        birthdate: row.birthdate,
        notes: row.notes,
        created_at: row.created_at,
    }
}

fn client_history_view(row: ClientRow, reveal: bool) -> ClientHistoryView {
    let cpf_display = row.cpf.map(|cpf| if reveal { cpf } else { mask_cpf(&cpf) });
    let phone_display = if reveal { row.phone } else { mask_phone(&row.phone) };
    ClientHistoryView {
        id: row.id,
        name: row.name,
        email: row.email,
        birthdate: row.birthdate,
        notes: row.notes,
        created_at: row.created_at,
        cpf_display,
        phone_display,
    }
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

async fn create_service(
    state: web::Data<AppState>,
    payload: web::Json<ServicePayload>,
) -> Result<HttpResponse, ApiError> {
    let service = sqlx::query_as::<_, ServiceRow>(
        r#"INSERT INTO services (name, description, price, duration)
           VALUES ($1, $2, $3, $4)
           RETURNING id, name, description, price, duration, active,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.duration)
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(service))
}

/// Soft delete. The row stays so past appointments and sales keep their
/// service reference.
async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("UPDATE services SET active = false WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn list_online_appointments(
    state: web::Data<AppState>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    let reveal = reveal_requested(&state, &query);
    let rows = sqlx::query_as::<_, OnlineAppointmentRow>(
        r#"SELECT oa.id, oa.client_name, oa.client_cpf, oa.client_phone, oa.client_email,
                  oa.service_id,
                  to_char(oa.appointment_date, 'YYYY-MM-DD') AS appointment_date,
                  to_char(oa.appointment_time, 'HH24:MI') AS appointment_time,
                  oa.status, oa.reminder_sent,
                  to_char(oa.created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at,
                  to_char(oa.confirmed_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS confirmed_at,
                  to_char(oa.cancelled_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS cancelled_at,
                  s.name AS service_name, s.price AS service_price
           FROM online_appointments oa
           LEFT JOIN services s ON oa.service_id = s.id
           ORDER BY oa.appointment_date DESC, oa.appointment_time DESC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let views: Vec<OnlineAppointmentView> =
        rows.into_iter().map(|row| online_view(row, reveal)).collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn confirm_online_appointment(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let updated: Option<i32> = sqlx::query_scalar(
        r#"UPDATE online_appointments
           SET status = $1, confirmed_at = CURRENT_TIMESTAMP
           WHERE id = $2
           RETURNING id"#,
    )
    .bind(STATUS_CONFIRMED)
    .bind(path.into_inner())
    .fetch_optional(&state.db)
    .await
    // Re-confirming a cancelled booking re-enters the slot index and can
    // collide with a booking made in the meantime.
    .map_err(|err| ApiError::conflict_on_unique(err, "Time slot not available"))?;

    let id = updated.ok_or(ApiError::NotFound("Appointment not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

async fn cancel_online_appointment(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let updated: Option<i32> = sqlx::query_scalar(
        r#"UPDATE online_appointments
           SET status = $1, cancelled_at = CURRENT_TIMESTAMP
           WHERE id = $2
           RETURNING id"#,
    )
    .bind(STATUS_CANCELLED)
    .bind(path.into_inner())
    .fetch_optional(&state.db)
    .await?;

    let id = updated.ok_or(ApiError::NotFound("Appointment not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

async fn mark_reminder_sent(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let updated: Option<i32> = sqlx::query_scalar(
        "UPDATE online_appointments SET reminder_sent = true WHERE id = $1 RETURNING id",
    )
    .bind(path.into_inner())
    .fetch_optional(&state.db)
    .await?;

    let id = updated.ok_or(ApiError::NotFound("Appointment not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

/// Confirmed bookings for tomorrow that have not been reminded yet. The
/// front desk works through this list each afternoon.
async fn list_reminders(
    state: web::Data<AppState>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    let reveal = reveal_requested(&state, &query);
    let tomorrow = slots::salon_tomorrow();
    let rows = sqlx::query_as::<_, OnlineAppointmentRow>(
        r#"SELECT oa.id, oa.client_name, oa.client_cpf, oa.client_phone, oa.client_email,
                  oa.service_id,
                  to_char(oa.appointment_date, 'YYYY-MM-DD') AS appointment_date,
                  to_char(oa.appointment_time, 'HH24:MI') AS appointment_time,
                  oa.status, oa.reminder_sent,
                  to_char(oa.created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at,
                  to_char(oa.confirmed_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS confirmed_at,
                  to_char(oa.cancelled_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS cancelled_at,
                  s.name AS service_name, s.price AS service_price
           FROM online_appointments oa
           LEFT JOIN services s ON oa.service_id = s.id
           WHERE oa.appointment_date = $1::date
             AND oa.status = 'confirmed'
             AND oa.reminder_sent = false
           ORDER BY oa.appointment_time"#,
    )
    .bind(&tomorrow)
    .fetch_all(&state.db)
    .await?;

    let views: Vec<OnlineAppointmentView> =
        rows.into_iter().map(|row| online_view(row, reveal)).collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn list_clients(
    state: web::Data<AppState>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    let reveal = reveal_requested(&state, &query);
    let rows = sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, cpf, email,
                  to_char(birthdate, 'YYYY-MM-DD') AS birthdate, notes,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM clients
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await?;

    let views: Vec<ClientView> = rows.into_iter().map(|row| client_view(row, reveal)).collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn create_client(
    state: web::Data<AppState>,
    payload: web::Json<ClientPayload>,
) -> Result<HttpResponse, ApiError> {
    let row: (i32, String) = sqlx::query_as(
        r#"INSERT INTO clients (name, phone, cpf, email, birthdate, notes)
           VALUES ($1, $2, $3, $4, $5::date, $6)
           RETURNING id, name"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.phone)
    .bind(&payload.cpf)
    .bind(&payload.email)
    .bind(&payload.birthdate)
    .bind(&payload.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": row.0, "name": row.1 })))
}

async fn delete_client(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn client_history(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    let reveal = reveal_requested(&state, &query);
    let client_id = path.into_inner();

    let client = sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, cpf, email,
                  to_char(birthdate, 'YYYY-MM-DD') AS birthdate, notes,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM clients
           WHERE id = $1"#,
    )
    .bind(client_id)
    .fetch_optional(&state.db)
    .await?;

    let sales = sqlx::query_as::<_, ClientSaleRow>(
        r#"SELECT sa.id, sa.value, sa.payment_method,
                  to_char(sa.sale_date, 'YYYY-MM-DD') AS sale_date,
                  s.name AS service_name
           FROM sales sa
           LEFT JOIN services s ON sa.service_id = s.id
           WHERE sa.client_id = $1
           ORDER BY sa.sale_date DESC"#,
    )
    .bind(client_id)
    .fetch_all(&state.db)
    .await?;

    let appointments = sqlx::query_as::<_, ClientAppointmentRow>(
        r#"SELECT a.id,
                  to_char(a.appointment_date, 'YYYY-MM-DD') AS appointment_date,
                  to_char(a.appointment_time, 'HH24:MI') AS appointment_time,
                  a.notes, a.status,
                  s.name AS service_name
           FROM appointments a
           LEFT JOIN services s ON a.service_id = s.id
           WHERE a.client_id = $1
           ORDER BY a.appointment_date DESC"#,
    )
    .bind(client_id)
    .fetch_all(&state.db)
    .await?;

    let total_spent: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(value), 0)::float8 FROM sales WHERE client_id = $1",
    )
    .bind(client_id)
    .fetch_one(&state.db)
    .await?;

    let visit_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE client_id = $1")
        .bind(client_id)
        .fetch_one(&state.db)
        .await?;

    let client = client.map(|row| client_history_view(row, reveal));
    Ok(HttpResponse::Ok().json(json!({
        "client": client,
        "sales": sales,
        "appointments": appointments,
        "totalSpent": total_spent,
        "visitCount": visit_count,
    })))
}

async fn list_appointments(
    state: web::Data<AppState>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    let reveal = reveal_requested(&state, &query);
    let rows = sqlx::query_as::<_, WalkInAppointmentRow>(
        r#"SELECT a.id, a.client_id, a.service_id,
                  to_char(a.appointment_date, 'YYYY-MM-DD') AS appointment_date,
                  to_char(a.appointment_time, 'HH24:MI') AS appointment_time,
                  a.notes, a.status,
                  to_char(a.created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at,
                  c.name AS client_name, c.phone AS client_phone, c.cpf AS client_cpf,
                  s.name AS service_name
           FROM appointments a
           LEFT JOIN clients c ON a.client_id = c.id
           LEFT JOIN services s ON a.service_id = s.id
           ORDER BY a.appointment_date DESC, a.appointment_time DESC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let views: Vec<WalkInAppointmentView> =
        rows.into_iter().map(|row| walk_in_view(row, reveal)).collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn create_appointment(
    state: web::Data<AppState>,
    payload: web::Json<WalkInPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    if db::slot_taken(&state.db, &payload.appointment_date, &payload.appointment_time).await? {
        return Err(ApiError::Conflict("Time slot not available"));
    }

    let id = sqlx::query_scalar::<_, i32>(
        r#"INSERT INTO appointments
               (client_id, service_id, appointment_date, appointment_time, notes, status)
           VALUES ($1, $2, $3::date, $4::time, $5, $6)
           RETURNING id"#,
    )
    .bind(payload.client_id)
    .bind(payload.service_id)
    .bind(&payload.appointment_date)
    .bind(&payload.appointment_time)
    .bind(&payload.notes)
    .bind(STATUS_SCHEDULED)
    .fetch_one(&state.db)
    .await
    .map_err(|err| ApiError::conflict_on_unique(err, "Time slot not available"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

async fn delete_appointment(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn list_sales(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let sales = sqlx::query_as::<_, SaleRow>(
        r#"SELECT sa.id, sa.client_id, sa.service_id, sa.value, sa.payment_method,
                  to_char(sa.sale_date, 'YYYY-MM-DD') AS sale_date, sa.notes,
                  to_char(sa.created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at,
                  c.name AS client_name, s.name AS service_name
           FROM sales sa
           LEFT JOIN clients c ON sa.client_id = c.id
           LEFT JOIN services s ON sa.service_id = s.id
           ORDER BY sa.sale_date DESC"#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(sales))
}

async fn create_sale(
    state: web::Data<AppState>,
    payload: web::Json<SalePayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let sale_date = payload
        .sale_date
        .filter(|date| !date.trim().is_empty())
        .unwrap_or_else(slots::salon_today);

    let id = sqlx::query_scalar::<_, i32>(
        r#"INSERT INTO sales (client_id, service_id, value, payment_method, sale_date, notes)
           VALUES ($1, $2, $3, $4, $5::date, $6)
           RETURNING id"#,
    )
    .bind(payload.client_id)
    .bind(payload.service_id)
    .bind(payload.value)
    .bind(&payload.payment_method)
    .bind(&sale_date)
    .bind(&payload.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

async fn delete_sale(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM sales WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn list_products(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let products = sqlx::query_as::<_, ProductRow>(
        r#"SELECT id, name, category, quantity, min_stock,
                  to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at
           FROM products
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(products))
}

async fn create_product(
    state: web::Data<AppState>,
    payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, ApiError> {
    let product = sqlx::query_as::<_, ProductRow>(
        r#"INSERT INTO products (name, category, quantity, min_stock)
           VALUES ($1, $2, $3, $4)
           RETURNING id, name, category, quantity, min_stock,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.category)
    .bind(payload.quantity.unwrap_or(0))
    .bind(payload.min_stock.unwrap_or(5))
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(product))
}

/// Applies a signed delta to the stock count, clamped at zero.
async fn adjust_stock(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    payload: web::Json<StockPayload>,
) -> Result<HttpResponse, ApiError> {
    let product = sqlx::query_as::<_, ProductRow>(
        r#"UPDATE products
           SET quantity = GREATEST(0, quantity + $1)
           WHERE id = $2
           RETURNING id, name, category, quantity, min_stock,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') AS created_at"#,
    )
    .bind(payload.delta)
    .bind(path.into_inner())
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Product not found"))?;

    Ok(HttpResponse::Ok().json(product))
}

async fn delete_product(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Dashboard counters. Today covers walk-ins of any status plus confirmed
/// online bookings; revenue and sale counts run from the first of the month.
async fn stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let today = slots::salon_today();
    let month_start = slots::salon_month_start();

    let walk_ins_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE appointment_date = $1::date")
            .bind(&today)
            .fetch_one(&state.db)
            .await?;

    let online_today: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM online_appointments
           WHERE appointment_date = $1::date AND status = 'confirmed'"#,
    )
    .bind(&today)
    .fetch_one(&state.db)
    .await?;

    let month_revenue: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(value), 0)::float8 FROM sales WHERE sale_date >= $1::date",
    )
    .bind(&month_start)
    .fetch_one(&state.db)
    .await?;

    let total_clients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
        .fetch_one(&state.db)
        .await?;

    let month_sales: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE sale_date >= $1::date")
            .bind(&month_start)
            .fetch_one(&state.db)
            .await?;

    let pending_appointments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM online_appointments WHERE status = 'pending'")
            .fetch_one(&state.db)
            .await?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        today_appointments: walk_ins_today + online_today,
        month_revenue,
        total_clients,
        month_sales,
        pending_appointments,
    }))
}

async fn delete_review(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Fetches one raw phone number for the click-to-call button. Gated on a
/// live reveal grant, not just a session.
async fn get_phone(
    state: web::Data<AppState>,
    path: web::Path<(String, i32)>,
    query: web::Query<RevealQuery>,
) -> Result<HttpResponse, ApiError> {
    if !reveal_requested(&state, &query) {
        return Err(ApiError::Forbidden("Reveal data first to access phone numbers"));
    }

    let (kind, id) = path.into_inner();
    let phone: Option<String> = match kind.as_str() {
        "client" => {
            sqlx::query_scalar("SELECT phone FROM clients WHERE id = $1")
                .bind(id)
                .fetch_optional(&state.db)
                .await?
        }
        "appointment" => {
            sqlx::query_scalar("SELECT client_phone FROM online_appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&state.db)
                .await?
        }
        _ => None,
    };

    let phone = phone.ok_or(ApiError::NotFound("Phone not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "phone": phone })))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use sqlx::PgPool;

    use crate::config::AppConfig;
    use crate::identity::IdentityField;
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

    fn walk_in(date: &str, time: &str) -> web::Json<WalkInPayload> {
        web::Json(WalkInPayload {
            client_id: None,
            service_id: None,
            appointment_date: date.into(),
            appointment_time: time.into(),
            notes: None,
        })
    }

    #[sqlx::test]
    async fn walk_in_cannot_take_a_slot_booked_online(pool: PgPool) {
        sqlx::query(
            "INSERT INTO online_appointments
                 (client_name, client_cpf, client_phone, appointment_date, appointment_time)
             VALUES ('Ana Souza', '', '11987654321', '2031-05-20', '10:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let state = test_state(pool);
        let result = create_appointment(state, walk_in("2031-05-20", "10:00")).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[sqlx::test]
    async fn walk_in_takes_a_free_slot(pool: PgPool) {
        let state = test_state(pool);

        let response = create_appointment(state.clone(), walk_in("2031-05-20", "10:00"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let second = create_appointment(state, walk_in("2031-05-20", "10:00")).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));
    }
}
