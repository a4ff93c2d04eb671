use std::time::Duration;

use clap::Args;
use mala::uuids::TypedUuid;
use mala_app::{context::AppContext, render, tracking::OrderTracker};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct OrderArgs {
    /// Order ID
    id: Uuid,

    /// Keep polling until the order is completed or cancelled
    #[arg(long)]
    follow: bool,

    /// Seconds between polls when following
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

pub(crate) async fn run(context: &AppContext, args: OrderArgs) -> Result<(), String> {
    let records = context.records().map_err(|error| error.to_string())?;
    let tracker = OrderTracker::new();
    let id = TypedUuid::from_uuid(args.id);

    let snapshot = tracker
        .refresh(records.as_ref(), id)
        .await
        .map_err(|error| format!("failed to load order {id}: {error}"))?;

    println!("{}", render::order_table(&snapshot, context.currency));

    if !args.follow || snapshot.order.status.is_terminal() {
        return Ok(());
    }

    let mut updates = tracker.subscribe();
    let currency = context.currency;
    let mut last_status = snapshot.order.status;

    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();

            if let Some(snapshot) = current.filter(|snapshot| snapshot.order.status != last_status) {
                last_status = snapshot.order.status;
                println!("{}", render::order_table(&snapshot, currency));
            }
        }
    });

    let result = tracker
        .follow(records.as_ref(), id, Duration::from_secs(args.interval))
        .await;

    drop(tracker);
    _ = printer.await;

    result
        .map(|_| ())
        .map_err(|error| format!("failed to follow order {id}: {error}"))
}
