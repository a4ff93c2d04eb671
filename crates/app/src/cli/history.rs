use std::time::Duration;

use clap::Args;
use mala_app::{context::AppContext, render, tracking::HistoryTracker};

#[derive(Debug, Args)]
pub(crate) struct HistoryArgs {
    /// Keep polling until every order is completed or cancelled
    #[arg(long)]
    follow: bool,

    /// Seconds between polls when following
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

pub(crate) async fn run(context: &AppContext, args: HistoryArgs) -> Result<(), String> {
    let ids = context
        .history
        .list()
        .map_err(|error| format!("failed to read order history: {error}"))?;

    if ids.is_empty() {
        println!("no orders placed from this device");
        return Ok(());
    }

    let records = context.records().map_err(|error| error.to_string())?;
    let tracker = HistoryTracker::new();

    let orders = tracker
        .refresh(records.as_ref(), &ids)
        .await
        .map_err(|error| format!("failed to load orders: {error}"))?;

    println!("{}", render::orders_table(&orders, context.currency));

    if !args.follow || orders.iter().all(|order| order.status.is_terminal()) {
        return Ok(());
    }

    let mut updates = tracker.subscribe();
    let currency = context.currency;
    let mut last_statuses: Vec<_> = orders.iter().map(|order| (order.id, order.status)).collect();

    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();
            let statuses: Vec<_> = current.iter().map(|order| (order.id, order.status)).collect();

            if statuses != last_statuses {
                last_statuses = statuses;
                println!("{}", render::orders_table(&current, currency));
            }
        }
    });

    let result = tracker
        .follow(records.as_ref(), &ids, Duration::from_secs(args.interval))
        .await;

    drop(tracker);
    _ = printer.await;

    result
        .map(|_| ())
        .map_err(|error| format!("failed to follow order history: {error}"))
}
