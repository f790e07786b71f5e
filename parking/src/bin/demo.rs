//! Booking walkthrough against the seeded demo catalog.
//!
//! Two customers race for the same slot: the first has to sign in halfway
//! through, the second loses the slot at confirmation and is sent back to
//! pick another one. Ends with the owner's dashboard for the space.

use chrono::Days;
use parking::analytics::OwnerDashboard;
use parking::flow::{DetailsInput, FlowEnvironment};
use parking::payment_gateway::MockPaymentGateway;
use parking::{
    BookingError, BookingFlowStore, Config, InMemoryBackend, ReservationCommitter, Role,
    SessionIdentity, SlotCatalog, SpaceQuery, VehicleType, metrics, seed,
};
use parkbook_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    metrics::register_business_metrics();
    info!(
        seed = config.seed,
        max_duration_hours = config.booking.max_duration_hours,
        "Configuration loaded"
    );

    // Catalog and collaborators
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(SlotCatalog::with_spaces(seed::demo_catalog(config.seed)));
    let committer = ReservationCommitter::new(
        Arc::clone(&catalog),
        MockPaymentGateway::shared(),
        Arc::clone(&clock),
    );

    let cars = SpaceQuery::new().vehicle_type(VehicleType::Car).available_only();
    let Some(space) = catalog.search(&cars).await.into_iter().next() else {
        warn!("No space has a free car slot");
        return Ok(());
    };
    info!(space = %space.name, available = space.available_slots, "Target space");

    let tomorrow = clock
        .now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or("date out of range")?;
    let details = DetailsInput::new(
        "KA 01 AB 1234",
        tomorrow.format("%Y-%m-%d").to_string(),
        "10:00",
        "2",
    );

    // First customer: anonymous until the login prompt appears
    let asha = SessionIdentity::new();
    let asha_flow = BookingFlowStore::with_space(
        space.clone(),
        flow_env(&config, &clock, &committer, &asha),
    );

    asha_flow.select_vehicle_type(VehicleType::Car).await?;
    let picked = asha_flow
        .current_state()
        .await
        .selectable_slots()
        .first()
        .map(|tile| tile.slot_id)
        .ok_or("no selectable car slot")?;
    asha_flow.select_slot(picked).await?;

    let prompt = asha.clone();
    let login = tokio::spawn(async move {
        prompt.wait_for_prompt().await;
        info!("Login prompt shown, signing in");
        prompt.login("asha@example.com", Role::Customer)
    });
    let snapshot = asha_flow.set_details(details.clone()).await?;
    login.await??;
    info!(step = %snapshot.step, total = ?snapshot.total(), "Details accepted after login");

    // Second customer picks the same slot before the first one confirms
    let ravi = SessionIdentity::new();
    ravi.login("ravi@example.com", Role::Customer)?;
    let ravi_flow = BookingFlowStore::with_space(
        space.clone(),
        flow_env(&config, &clock, &committer, &ravi),
    );
    ravi_flow.select_vehicle_type(VehicleType::Car).await?;
    ravi_flow.select_slot(picked).await?;
    ravi_flow.set_details(details.clone()).await?;

    let booked = asha_flow.confirm().await?;
    if let Some(booking) = &booked.booking {
        info!(
            reference = %booking.reference,
            slot = %booking.slot_label,
            total = %booking.total_amount,
            payment = ?booking.payment_status,
            "First customer booked"
        );
    }

    match ravi_flow.confirm().await {
        Err(BookingError::SlotNoLongerAvailable { .. }) => {
            let snapshot = ravi_flow.current_state().await;
            info!(
                step = %snapshot.step,
                selectable = snapshot.selectable_slots().len(),
                "Second customer lost the slot and is choosing again"
            );
            if let Some(tile) = snapshot.selectable_slots().first() {
                let slot_id = tile.slot_id;
                ravi_flow.select_slot(slot_id).await?;
                ravi_flow.set_details(details).await?;
                let snapshot = ravi_flow.confirm().await?;
                info!(slot = ?snapshot.slot_label, step = %snapshot.step, "Second customer booked");
            }
        },
        Err(error) => return Err(error.into()),
        Ok(_) => warn!("Both customers booked the same slot"),
    }

    let dashboard = OwnerDashboard::compute(&catalog.snapshot().await, space.owner.id);
    info!(
        owner = %space.owner.name,
        spaces = dashboard.spaces.len(),
        active_bookings = dashboard.active_bookings,
        revenue = %dashboard.revenue,
        occupancy = %dashboard.occupancy_percent(),
        "Owner dashboard"
    );

    Ok(())
}

fn flow_env(
    config: &Config,
    clock: &Arc<dyn Clock>,
    committer: &ReservationCommitter,
    session: &SessionIdentity,
) -> FlowEnvironment {
    let identity = Arc::new(session.clone());
    let backend = InMemoryBackend::new(committer.clone(), identity.clone());
    FlowEnvironment::with_config(Arc::clone(clock), Arc::new(backend), identity, config)
}
