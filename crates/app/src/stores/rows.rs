//! Wire rows
//!
//! Column names follow the hosted schema. Money columns are major-unit
//! numerics there and minor-unit integers everywhere else.

use jiff::Timestamp;
use mala::{
    menu::{MenuItem, MenuItemUuid},
    orders::{
        NewOrder, NewOrderItem, Order, OrderItem, OrderItemUuid, OrderStatus, OrderUuid,
        PaymentMethod, SpiceLevel,
    },
    session::SessionId,
};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use super::StoreError;

/// Converts between major-unit decimals and minor-unit integers for one currency.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Amounts {
    exponent: u32,
}

impl Amounts {
    pub(crate) const fn new(exponent: u32) -> Self {
        Self { exponent }
    }

    pub(crate) fn to_minor(self, value: Decimal) -> Result<u64, StoreError> {
        let scale = Decimal::from(10_u64.pow(self.exponent));

        value
            .checked_mul(scale)
            .map(|minor| minor.round())
            .and_then(|minor| minor.to_u64())
            .ok_or_else(|| StoreError::InvalidAmount(value.to_string()))
    }

    pub(crate) fn to_major(self, minor: u64) -> Result<Decimal, StoreError> {
        Decimal::try_from_i128_with_scale(i128::from(minor), self.exponent)
            .map(|value| value.normalize())
            .map_err(|_| StoreError::InvalidAmount(minor.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MenuItemRow {
    id: MenuItemUuid,
    name: String,
    name_en: Option<String>,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    category: Option<String>,
    #[serde(default = "available")]
    is_available: bool,
}

const fn available() -> bool {
    true
}

impl MenuItemRow {
    pub(crate) fn into_model(self, amounts: Amounts) -> Result<MenuItem, StoreError> {
        Ok(MenuItem {
            id: self.id,
            name: self.name,
            localized_name: non_empty(self.name_en),
            description: non_empty(self.description),
            price: amounts.to_minor(self.price)?,
            image_reference: non_empty(self.image_url),
            category: non_empty(self.category),
            is_available: self.is_available,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderRow {
    id: OrderUuid,
    session_id: Option<String>,
    customer_name: String,
    customer_phone: String,
    delivery_address: String,
    spice_level: SpiceLevel,
    payment_method: PaymentMethod,
    payment_slip_url: Option<String>,
    #[serde(default)]
    subtotal_amount: Option<Decimal>,
    #[serde(default)]
    discount_amount: Option<Decimal>,
    total_amount: Decimal,
    notes: Option<String>,
    status: OrderStatus,
    #[serde(default)]
    is_modified: bool,
    #[serde(default)]
    original_total_amount: Option<Decimal>,
    #[serde(default)]
    modification_note: Option<String>,
    created_at: Timestamp,
}

impl OrderRow {
    pub(crate) fn into_model(self, amounts: Amounts) -> Result<Order, StoreError> {
        let total = amounts.to_minor(self.total_amount)?;

        Ok(Order {
            id: self.id,
            session: non_empty(self.session_id).map(SessionId::new),
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            delivery_address: self.delivery_address,
            spice_level: self.spice_level,
            payment_method: self.payment_method,
            payment_evidence: non_empty(self.payment_slip_url),
            subtotal: self
                .subtotal_amount
                .map_or(Ok(total), |value| amounts.to_minor(value))?,
            discount: self
                .discount_amount
                .map_or(Ok(0), |value| amounts.to_minor(value))?,
            total,
            notes: self.notes.unwrap_or_default(),
            status: self.status,
            is_modified: self.is_modified,
            original_total: self
                .original_total_amount
                .map(|value| amounts.to_minor(value))
                .transpose()?,
            modification_note: non_empty(self.modification_note),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewOrderRow {
    session_id: String,
    customer_name: String,
    customer_phone: String,
    delivery_address: String,
    spice_level: SpiceLevel,
    payment_method: PaymentMethod,
    payment_slip_url: String,
    subtotal_amount: Decimal,
    discount_amount: Decimal,
    total_amount: Decimal,
    notes: String,
    status: OrderStatus,
}

impl NewOrderRow {
    pub(crate) fn from_model(order: NewOrder, amounts: Amounts) -> Result<Self, StoreError> {
        Ok(Self {
            session_id: order.session.as_str().to_string(),
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            delivery_address: order.delivery_address,
            spice_level: order.spice_level,
            payment_method: order.payment_method,
            payment_slip_url: order.payment_evidence.unwrap_or_default(),
            subtotal_amount: amounts.to_major(order.subtotal)?,
            discount_amount: amounts.to_major(order.discount)?,
            total_amount: amounts.to_major(order.total)?,
            notes: order.notes,
            status: order.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderItemRow {
    id: OrderItemUuid,
    order_id: OrderUuid,
    menu_item_id: Option<MenuItemUuid>,
    menu_item_name: String,
    menu_item_price: Decimal,
    quantity: u32,
    #[serde(default)]
    original_quantity: Option<u32>,
    subtotal: Decimal,
}

impl OrderItemRow {
    pub(crate) fn into_model(self, amounts: Amounts) -> Result<OrderItem, StoreError> {
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            menu_item_id: self.menu_item_id,
            name: self.menu_item_name,
            unit_price: amounts.to_minor(self.menu_item_price)?,
            quantity: self.quantity,
            original_quantity: self.original_quantity,
            subtotal: amounts.to_minor(self.subtotal)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewOrderItemRow {
    order_id: OrderUuid,
    menu_item_id: MenuItemUuid,
    menu_item_name: String,
    menu_item_price: Decimal,
    quantity: u32,
    subtotal: Decimal,
}

impl NewOrderItemRow {
    pub(crate) fn from_model(item: NewOrderItem, amounts: Amounts) -> Result<Self, StoreError> {
        Ok(Self {
            order_id: item.order_id,
            menu_item_id: item.menu_item_id,
            menu_item_name: item.name,
            menu_item_price: amounts.to_major(item.unit_price)?,
            quantity: item.quantity,
            subtotal: amounts.to_major(item.subtotal)?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    const THB: Amounts = Amounts::new(2);

    #[test]
    fn converts_major_to_minor() -> TestResult {
        assert_eq!(THB.to_minor(Decimal::new(15, 0))?, 15_00);
        assert_eq!(THB.to_minor(Decimal::new(1250, 2))?, 12_50);

        Ok(())
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            THB.to_minor(Decimal::new(-1, 0)),
            Err(StoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn converts_minor_to_major() -> TestResult {
        assert_eq!(THB.to_major(15_00)?, Decimal::new(15, 0));
        assert_eq!(THB.to_major(12_50)?.to_string(), "12.5");

        Ok(())
    }

    #[test]
    fn decodes_order_row_from_hosted_schema() -> TestResult {
        let row: OrderRow = serde_json::from_value(serde_json::json!({
            "id": "0190a6d6-7a3e-7000-8000-000000000001",
            "session_id": "session_1_abcdefg",
            "customer_name": "Somchai",
            "customer_phone": "0812345678",
            "delivery_address": "Replay",
            "spice_level": "เผ็ดน้อย",
            "payment_method": "slip",
            "payment_slip_url": "",
            "subtotal_amount": 150,
            "discount_amount": 10,
            "total_amount": 140,
            "notes": null,
            "status": "preparing",
            "is_modified": false,
            "created_at": "2026-01-02T03:04:05.678Z"
        }))?;

        let order = row.into_model(THB)?;

        assert_eq!(order.subtotal, 150_00);
        assert_eq!(order.discount, 10_00);
        assert_eq!(order.total, 140_00);
        assert_eq!(order.payment_evidence, None);
        assert_eq!(order.spice_level, SpiceLevel::Mild);
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.notes, "");

        Ok(())
    }

    #[test]
    fn encodes_new_order_with_empty_slip_reference() -> TestResult {
        let row = NewOrderRow::from_model(
            NewOrder {
                session: SessionId::new("s1"),
                customer_name: "Somchai".to_string(),
                customer_phone: "0812345678".to_string(),
                delivery_address: "Replay".to_string(),
                spice_level: SpiceLevel::Medium,
                payment_method: PaymentMethod::Cash,
                payment_evidence: None,
                subtotal: 50_00,
                discount: 0,
                total: 50_00,
                notes: String::new(),
                status: OrderStatus::Pending,
            },
            THB,
        )?;

        let value = serde_json::to_value(&row)?;

        assert_eq!(value["payment_slip_url"], "");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["session_id"], "s1");

        Ok(())
    }
}
