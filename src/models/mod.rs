pub mod bus;
pub mod payment;
pub mod response;
pub mod route;
pub mod seat;
pub mod ticket;
pub mod trip;
pub mod user;

pub use bus::{Bus, BusRequest, BusResponse};
pub use payment::{Payment, PaymentPurpose, PaymentRequest, PaymentStatus, PaymentStatusRequest, PaymentType};
pub use response::ApiResponse;
pub use route::{Route, RouteRequest};
pub use seat::{Seat, SeatStatusRequest};
pub use ticket::{Ticket, TicketRequest, TicketResponse, TicketUpdateRequest};
pub use trip::{Trip, TripCreateRequest, TripResponse, TripStatus, TripUpdateRequest};
pub use user::{Role, UpdateRoleRequest, User, UserUpdateRequest};

pub use crate::seatmap::SeatStatus;

use validator::ValidationError;

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub(crate) fn not_in_past(value: &chrono::NaiveDateTime) -> Result<(), ValidationError> {
    if *value < chrono::Local::now().naive_local() {
        return Err(ValidationError::new("departure_in_past"));
    }
    Ok(())
}

/// Binary attachments travel as standard base64 strings in JSON.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(encoded) if !encoded.is_empty() => general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
