pub mod buses;
pub mod payments;
pub mod routes;
pub mod seats;
pub mod tickets;
pub mod trips;
pub mod users;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(buses::routes())
        .merge(routes::routes())
        .merge(trips::routes())
        .merge(seats::routes())
        .merge(tickets::routes())
        .merge(payments::routes())
        .merge(users::routes())
}
