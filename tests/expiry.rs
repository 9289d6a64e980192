mod common;

use boxoffice::models::BookingStatus;
use boxoffice::seatmap::SeatId;
use boxoffice::services::expiry::ExpirySweeper;
use boxoffice::store::BookingStore;
use chrono::Utc;

use common::*;

fn seats(labels: &[&str]) -> Vec<SeatId> {
    labels.iter().map(|s| s.parse().unwrap()).collect()
}

#[tokio::test]
async fn sweep_releases_expired_holds_for_rebooking() {
    let app = TestApp::new();
    let show = app.seed_show().await;
    let reservation = app
        .state
        .reservations
        .reserve(show.id, "alice", &seats(&["A1", "A2"]))
        .await
        .unwrap();

    // Hold of zero minutes: anything already created is past its window.
    let sweeper = ExpirySweeper::new(app.store.clone(), 0);
    assert_eq!(sweeper.run_once().await.unwrap(), 1);

    let booking = app.booking(reservation.booking_id).await;
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert!(app.store.occupied_seats(show.id).await.unwrap().is_empty());

    // The freed seats can be taken again.
    let retry = app
        .state
        .reservations
        .reserve(show.id, "bob", &seats(&["A1", "A2"]))
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn sweep_spares_paid_bookings() {
    let app = TestApp::new();
    let show = app.seed_show().await;

    let paid = app
        .state
        .reservations
        .reserve(show.id, "alice", &seats(&["C1"]))
        .await
        .unwrap();
    app.store.mark_paid(paid.booking_id, Utc::now()).await.unwrap();

    let pending = app
        .state
        .reservations
        .reserve(show.id, "bob", &seats(&["C2"]))
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(app.store.clone(), 0);
    assert_eq!(sweeper.run_once().await.unwrap(), 1);

    assert_eq!(
        app.booking(paid.booking_id).await.status,
        BookingStatus::Paid
    );
    assert_eq!(
        app.booking(pending.booking_id).await.status,
        BookingStatus::Cancelled
    );
}

#[tokio::test]
async fn sweep_spares_holds_inside_the_window() {
    let app = TestApp::new();
    let show = app.seed_show().await;
    let reservation = app
        .state
        .reservations
        .reserve(show.id, "alice", &seats(&["D1"]))
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(app.store.clone(), 15);
    assert_eq!(sweeper.run_once().await.unwrap(), 0);
    assert_eq!(
        app.booking(reservation.booking_id).await.status,
        BookingStatus::Pending
    );
}
