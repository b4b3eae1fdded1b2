//! Seat lifecycle against a real database: booking, payment review, moving
//! and cancelling tickets. Each test gets a fresh migrated database.

use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;

use bus_ticketing::{
    config::Config,
    database::Database,
    error::AppError,
    middleware::AuthUser,
    models::{
        Bus, BusRequest, Payment, PaymentStatus, PaymentType, Role, Route, RouteRequest, Seat,
        SeatStatus, SeatStatusRequest, TicketRequest, TicketResponse, TicketUpdateRequest, Trip,
        TripStatus,
    },
    services::{booking, payments, seats},
    AppState,
};

const RECEIPT: &[u8] = b"gcash-ref-0042";

fn state(pool: PgPool) -> Arc<AppState> {
    Arc::new(AppState {
        db: Database { pool },
        cache: None,
        config: Config::for_tests("booking-test-secret"),
    })
}

fn staff() -> AuthUser {
    AuthUser {
        user_id: 1,
        email: "counter@btts.ph".to_string(),
        role: Role::TicketStaff,
        first_name: None,
        last_name: None,
    }
}

async fn passenger(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email, role) VALUES ($1, 'PASSENGER') RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A 5x4 bus on its own route, departing far in the future.
async fn trip(pool: &PgPool, plate: &str, status: TripStatus) -> Trip {
    let bus = Bus::create(
        pool,
        &BusRequest {
            plate_number: plate.to_string(),
            name: "Ceres Liner".to_string(),
            operator: "Vallacar Transit".to_string(),
            row_count: 5,
            column_count: 4,
        },
    )
    .await
    .unwrap();
    let route = Route::create(
        pool,
        &RouteRequest {
            origin: "Cebu".to_string(),
            destination: "Moalboal".to_string(),
            stops: vec!["Naga".to_string(), "Carcar".to_string()],
            base_price: 180.0,
        },
    )
    .await
    .unwrap();
    let departure = NaiveDate::from_ymd_opt(2099, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    Trip::create(pool, departure, status, bus.id, route.id).await.unwrap()
}

fn ticket(trip_id: i64, user_id: i64, (row, column): (i32, i32), payment_type: PaymentType) -> TicketRequest {
    TicketRequest {
        row_position: row,
        column_position: column,
        trip_id,
        fare: 180.0,
        drop_off: "Carcar".to_string(),
        user_id,
        payment_type,
        online_receipt: match payment_type {
            PaymentType::Cash => None,
            PaymentType::Online => Some(RECEIPT.to_vec()),
        },
    }
}

async fn book(
    state: &AppState,
    trip_id: i64,
    user_id: i64,
    position: (i32, i32),
    payment_type: PaymentType,
) -> Result<TicketResponse, AppError> {
    booking::create_ticket(state, &staff(), ticket(trip_id, user_id, position, payment_type), payment_type).await
}

async fn seat(pool: &PgPool, id: i64) -> Seat {
    Seat::find(pool, id).await.unwrap().unwrap()
}

async fn holder(pool: &PgPool, seat_id: i64) -> Option<i64> {
    sqlx::query_scalar("SELECT held_by FROM seats WHERE id = $1")
        .bind(seat_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./src/migrations")]
async fn cash_books_and_online_reserves(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1001", TripStatus::Scheduled).await;
    let user = passenger(&pool, "juan@btts.ph").await;

    let cash = book(&state, trip.id, user, (1, 1), PaymentType::Cash).await.unwrap();
    assert_eq!(cash.seat.status, SeatStatus::Booked);
    assert_eq!(cash.seat.seat_id().as_str(), "1A");
    assert_eq!(cash.payments.len(), 1);
    assert_eq!(cash.payments[0].status, PaymentStatus::Pending);
    assert!(cash.payments[0].online_receipt.is_none());

    let online = book(&state, trip.id, user, (1, 2), PaymentType::Online).await.unwrap();
    assert_eq!(online.seat.status, SeatStatus::Reserved);
    assert_eq!(online.payments[0].online_receipt.as_deref(), Some(RECEIPT));
    assert_eq!(holder(&pool, online.seat.id).await, Some(online.id));

    // Two seats taken out of twenty
    assert_eq!(online.trip.available_seats, 18);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn taken_or_missing_seats_cannot_be_booked(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1002", TripStatus::Scheduled).await;
    let user = passenger(&pool, "maria@btts.ph").await;

    book(&state, trip.id, user, (1, 1), PaymentType::Cash).await.unwrap();
    book(&state, trip.id, user, (1, 2), PaymentType::Online).await.unwrap();
    seats::set_seat_status(
        &state,
        trip.id,
        &SeatStatusRequest {
            row_position: 2,
            column_position: 1,
            status: SeatStatus::Unavailable,
        },
    )
    .await
    .unwrap();

    for position in [(1, 1), (1, 2), (2, 1)] {
        let err = book(&state, trip.id, user, position, PaymentType::Cash).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{:?}: {:?}", position, err);
    }

    let err = book(&state, trip.id, user, (6, 1), PaymentType::Cash).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = book(&state, trip.id, user, (1, 5), PaymentType::Cash).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Failed attempts leave nothing behind
    assert_eq!(Seat::by_trip(&pool, trip.id).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn closed_trips_take_no_bookings_or_moves(pool: PgPool) {
    let state = state(pool.clone());
    let open = trip(&pool, "CEB-1003", TripStatus::Boarding).await;
    let departed = trip(&pool, "CEB-1004", TripStatus::Departed).await;
    let cancelled = trip(&pool, "CEB-1005", TripStatus::Cancelled).await;
    let user = passenger(&pool, "pedro@btts.ph").await;

    for closed in [&departed, &cancelled] {
        let err = book(&state, closed.id, user, (1, 1), PaymentType::Cash).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    let booked = book(&state, open.id, user, (3, 2), PaymentType::Cash).await.unwrap();
    for closed in [&departed, &cancelled] {
        let err = booking::update_ticket(
            &state,
            booked.id,
            TicketUpdateRequest {
                trip_id: Some(closed.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);
        assert!(Seat::by_trip(&pool, closed.id).await.unwrap().is_empty());
    }

    // The ticket keeps its original seat
    let kept = seat(&pool, booked.seat.id).await;
    assert_eq!(kept.status, SeatStatus::Booked);
    assert_eq!(holder(&pool, kept.id).await, Some(booked.id));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn seat_follows_payment_review(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1006", TripStatus::Scheduled).await;
    let user = passenger(&pool, "ana@btts.ph").await;

    let online = book(&state, trip.id, user, (4, 3), PaymentType::Online).await.unwrap();
    let payment = online.payments[0].id;

    let approved = payments::update_status(&state, payment, PaymentStatus::Approved).await.unwrap();
    assert_eq!(approved.status, PaymentStatus::Approved);
    assert_eq!(seat(&pool, online.seat.id).await.status, SeatStatus::Booked);

    let err = payments::update_status(&state, payment, PaymentStatus::Pending).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(seat(&pool, online.seat.id).await.status, SeatStatus::Booked);

    payments::update_status(&state, payment, PaymentStatus::Rejected).await.unwrap();
    assert_eq!(seat(&pool, online.seat.id).await.status, SeatStatus::Open);
    assert_eq!(holder(&pool, online.seat.id).await, None);

    // Nobody took the seat in between, so the ticket gets it back
    payments::update_status(&state, payment, PaymentStatus::Pending).await.unwrap();
    assert_eq!(seat(&pool, online.seat.id).await.status, SeatStatus::Reserved);
    assert_eq!(holder(&pool, online.seat.id).await, Some(online.id));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn deleting_a_ticket_opens_its_seat(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1007", TripStatus::Scheduled).await;
    let user = passenger(&pool, "lito@btts.ph").await;

    let first = book(&state, trip.id, user, (2, 2), PaymentType::Cash).await.unwrap();
    booking::delete_ticket(&state, first.id).await.unwrap();

    let released = seat(&pool, first.seat.id).await;
    assert_eq!(released.status, SeatStatus::Open);
    assert!(Payment::by_ticket(&pool, first.id).await.unwrap().is_empty());

    // The open record is reused by the next booking
    let second = book(&state, trip.id, user, (2, 2), PaymentType::Online).await.unwrap();
    assert_eq!(second.seat.id, first.seat.id);
    assert_eq!(second.seat.status, SeatStatus::Reserved);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn released_seat_belongs_to_the_next_booking(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1008", TripStatus::Scheduled).await;
    let first_user = passenger(&pool, "first@btts.ph").await;
    let second_user = passenger(&pool, "second@btts.ph").await;

    let first = book(&state, trip.id, first_user, (5, 4), PaymentType::Online).await.unwrap();
    let first_payment = first.payments[0].id;
    payments::update_status(&state, first_payment, PaymentStatus::Rejected).await.unwrap();

    let second = book(&state, trip.id, second_user, (5, 4), PaymentType::Online).await.unwrap();
    assert_eq!(second.seat.id, first.seat.id);
    assert_eq!(holder(&pool, second.seat.id).await, Some(second.id));

    // The first ticket can no longer approve, move or free the seat
    let err = payments::update_status(&state, first_payment, PaymentStatus::Approved).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = booking::update_ticket(
        &state,
        first.id,
        TicketUpdateRequest {
            row_position: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    booking::delete_ticket(&state, first.id).await.unwrap();
    let still_held = seat(&pool, second.seat.id).await;
    assert_eq!(still_held.status, SeatStatus::Reserved);
    assert_eq!(holder(&pool, still_held.id).await, Some(second.id));

    // The seat now follows the new holder's payment
    payments::update_status(&state, second.payments[0].id, PaymentStatus::Approved).await.unwrap();
    assert_eq!(seat(&pool, second.seat.id).await.status, SeatStatus::Booked);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn moving_a_ticket_carries_its_status(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1009", TripStatus::Scheduled).await;
    let user = passenger(&pool, "mover@btts.ph").await;

    let online = book(&state, trip.id, user, (1, 1), PaymentType::Online).await.unwrap();
    let moved = booking::update_ticket(
        &state,
        online.id,
        TicketUpdateRequest {
            row_position: Some(3),
            column_position: Some(4),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(moved.seat.seat_id().as_str(), "3D");
    assert_eq!(moved.seat.status, SeatStatus::Reserved);
    assert_eq!(holder(&pool, moved.seat.id).await, Some(online.id));

    let old = seat(&pool, online.seat.id).await;
    assert_eq!(old.status, SeatStatus::Open);
    assert_eq!(holder(&pool, old.id).await, None);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn concurrent_reviews_apply_in_turn(pool: PgPool) {
    let state = state(pool.clone());
    let trip = trip(&pool, "CEB-1010", TripStatus::Scheduled).await;
    let user = passenger(&pool, "race@btts.ph").await;

    let online = book(&state, trip.id, user, (2, 3), PaymentType::Online).await.unwrap();
    let payment = online.payments[0].id;

    // Hold the payment row as a review in progress would
    let mut tx = pool.begin().await.unwrap();
    let locked = Payment::find_for_update(&mut tx, payment).await.unwrap().unwrap();
    assert_eq!(locked.status, PaymentStatus::Pending);

    let racing = {
        let state = state.clone();
        tokio::spawn(async move { payments::update_status(&state, payment, PaymentStatus::Pending).await })
    };

    Payment::set_status(&mut *tx, payment, PaymentStatus::Approved).await.unwrap();
    Seat::set_status_for_ticket(&mut *tx, online.seat.id, online.id, SeatStatus::Booked)
        .await
        .unwrap()
        .unwrap();
    tx.commit().await.unwrap();

    // The second review sees the approval and may not undo it
    let err = racing.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(payments::find_payment(&state, payment).await.unwrap().status, PaymentStatus::Approved);
    assert_eq!(seat(&pool, online.seat.id).await.status, SeatStatus::Booked);
}
