use rust_decimal::Decimal;
use serde::Serialize;

// Online bookings move pending -> confirmed or cancelled; walk-in entries
// created at the desk start out scheduled.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_SCHEDULED: &str = "scheduled";

/// Date and time columns come back pre-formatted by `to_char`, so every
/// temporal field here is a plain string.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ServiceRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration: i32,
    pub active: bool,
    pub created_at: String,
}

/// A booking made through the public site, joined with its service. Holds
/// raw PII, so it is never serialized directly; admin handlers project it
/// through a masked view first.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OnlineAppointmentRow {
    pub id: i32,
    pub client_name: String,
    pub client_cpf: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub service_id: Option<i32>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub status: String,
    pub reminder_sent: bool,
    pub created_at: String,
    pub confirmed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub service_name: Option<String>,
    pub service_price: Option<Decimal>,
}

/// Client registry entry. Also PII-bearing, masked before serialization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// A walk-in appointment entered at the desk, joined with client and
/// service. Client columns are null when the client record was deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalkInAppointmentRow {
    pub id: i32,
    pub client_id: Option<i32>,
    pub service_id: Option<i32>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: String,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_cpf: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SaleRow {
    pub id: i32,
    pub client_id: Option<i32>,
    pub service_id: Option<i32>,
    pub value: Decimal,
    pub payment_method: String,
    pub sale_date: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub min_stock: i32,
    pub created_at: String,
}

/// Public review shape. The identity column is intentionally absent: it
/// never leaves the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ReviewRow {
    pub id: i32,
    pub client_name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClientSaleRow {
    pub id: i32,
    pub value: Decimal,
    pub payment_method: String,
    pub sale_date: String,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClientAppointmentRow {
    pub id: i32,
    pub appointment_date: String,
    pub appointment_time: String,
    pub notes: Option<String>,
    pub status: String,
    pub service_name: Option<String>,
}
