//! Terminal tables.

use mala::{
    cart::CartItem,
    discounts::Totals,
    menu::MenuItem,
    orders::{Order, OrderSnapshot},
};
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

/// Format a minor-unit amount in `currency`.
#[must_use]
pub fn money(minor: u64, currency: &Currency) -> String {
    Money::from_minor(i64::try_from(minor).unwrap_or(i64::MAX), currency).to_string()
}

fn finish(builder: Builder, amount_columns: std::ops::Range<usize>) -> String {
    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(amount_columns), Alignment::right());

    table.to_string()
}

/// The menu, one row per item.
#[must_use]
pub fn menu_table(items: &[MenuItem], currency: &Currency) -> String {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Item", "Category", "Price", ""]);

    for item in items {
        let name = match &item.localized_name {
            Some(localized) => format!("{}\n{localized}", item.name),
            None => item.name.clone(),
        };

        builder.push_record([
            item.id.to_string(),
            name,
            item.category.clone().unwrap_or_default(),
            money(item.price, currency),
            if item.is_available {
                String::new()
            } else {
                "sold out".to_string()
            },
        ]);
    }

    finish(builder, 3..4)
}

/// Cart lines followed by the priced summary.
#[must_use]
pub fn cart_table(items: &[CartItem], totals: &Totals<'_>) -> String {
    let currency = totals.subtotal.currency();
    let mut builder = Builder::default();

    builder.push_record(["ID", "Item", "Qty", "Price", "Subtotal"]);

    for item in items {
        builder.push_record([
            item.id().to_string(),
            item.name().to_string(),
            item.quantity().to_string(),
            money(item.unit_price(), currency),
            item.unit_price()
                .checked_mul(u64::from(item.quantity()))
                .map_or_else(String::new, |subtotal| money(subtotal, currency)),
        ]);
    }

    let table = finish(builder, 2..5);

    format!(
        "{table}\n Sticks:   {}\n Subtotal: {}\n Discount: {}\n Total:    {}\n",
        totals.stick_count, totals.subtotal, totals.discount, totals.total
    )
}

/// Orders as a summary list, newest first.
#[must_use]
pub fn orders_table(orders: &[Order], currency: &Currency) -> String {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Placed", "Status", "Delivery", "Total"]);

    for order in orders {
        builder.push_record([
            order.id.to_string(),
            order.created_at.strftime("%Y-%m-%d %H:%M").to_string(),
            order.status.as_str().to_string(),
            order.delivery_address.clone(),
            money(order.total, currency),
        ]);
    }

    finish(builder, 4..5)
}

/// One order with its lines.
#[must_use]
pub fn order_table(snapshot: &OrderSnapshot, currency: &Currency) -> String {
    let order = &snapshot.order;
    let mut builder = Builder::default();

    builder.push_record(["Item", "Qty", "Price", "Subtotal"]);

    for item in &snapshot.items {
        let quantity = match item.original_quantity {
            Some(original) if original != item.quantity => format!("{} (was {original})", item.quantity),
            _ => item.quantity.to_string(),
        };

        builder.push_record([
            item.name.clone(),
            quantity,
            money(item.unit_price, currency),
            money(item.subtotal, currency),
        ]);
    }

    let table = finish(builder, 1..4);

    let mut out = format!(
        "Order {}\n Status:   {}\n Customer: {} ({})\n Delivery: {}\n Payment:  {:?}\n{table}\n Subtotal: {}\n Discount: {}\n Total:    {}\n",
        order.id,
        order.status.as_str(),
        order.customer_name,
        order.customer_phone,
        order.delivery_address,
        order.payment_method,
        money(order.subtotal, currency),
        money(order.discount, currency),
        money(order.total, currency),
    );

    if order.is_modified {
        if let Some(original) = order.original_total {
            out.push_str(&format!(" Originally: {}\n", money(original, currency)));
        }

        if let Some(note) = &order.modification_note {
            out.push_str(&format!(" Note: {note}\n"));
        }
    }

    out
}
