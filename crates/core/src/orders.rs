//! Orders
//!
//! Orders and their lines are owned by the remote record store. Lines carry a
//! snapshot of the name and price at the time of ordering, so later menu
//! changes never alter a placed order.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    cart::CartItem,
    menu::MenuItemUuid,
    session::SessionId,
    uuids::TypedUuid,
};

/// Order identifier.
pub type OrderUuid = TypedUuid<Order>;

/// Order line identifier.
pub type OrderItemUuid = TypedUuid<OrderItem>;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Received, not yet acknowledged.
    #[default]
    Pending,
    /// Acknowledged by staff.
    Confirmed,
    /// Being cooked.
    Preparing,
    /// Ready for delivery or pickup.
    Ready,
    /// Delivered.
    Completed,
    /// Cancelled by staff.
    Cancelled,
}

impl OrderStatus {
    /// Whether no further status changes are expected.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Bank transfer evidenced by an uploaded slip photo.
    #[default]
    Slip,
    /// Cash on delivery.
    Cash,
}

impl PaymentMethod {
    /// Whether an evidence image must accompany the order.
    pub const fn requires_evidence(self) -> bool {
        matches!(self, Self::Slip)
    }
}

/// Requested spice level, stored with the venue's own labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpiceLevel {
    /// Not spicy.
    #[serde(rename = "ไม่เผ็ด")]
    None,
    /// Mildly spicy.
    #[serde(rename = "เผ็ดน้อย")]
    Mild,
    /// Medium.
    #[default]
    #[serde(rename = "เผ็ดกลาง")]
    Medium,
    /// Hot.
    #[serde(rename = "เผ็ดมาก")]
    Hot,
    /// Extra hot.
    #[serde(rename = "เผ็ดมากพิเศษ")]
    ExtraHot,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Identifier.
    pub id: OrderUuid,
    /// Session that placed the order.
    pub session: Option<SessionId>,
    /// Customer name.
    pub customer_name: String,
    /// Customer phone number.
    pub customer_phone: String,
    /// Delivery location.
    pub delivery_address: String,
    /// Requested spice level.
    pub spice_level: SpiceLevel,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Public reference to the uploaded payment slip.
    pub payment_evidence: Option<String>,
    /// Sum of line subtotals in minor units.
    pub subtotal: u64,
    /// Volume discount in minor units.
    pub discount: u64,
    /// Amount due in minor units.
    pub total: u64,
    /// Free-text customer notes.
    pub notes: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Whether staff changed the order after it was placed.
    pub is_modified: bool,
    /// Total before staff modification.
    pub original_total: Option<u64>,
    /// Staff note explaining a modification.
    pub modification_note: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Identifier.
    pub id: OrderItemUuid,
    /// Owning order.
    pub order_id: OrderUuid,
    /// Menu item the line was ordered from.
    pub menu_item_id: Option<MenuItemUuid>,
    /// Name at the time of ordering.
    pub name: String,
    /// Unit price at the time of ordering, in minor units.
    pub unit_price: u64,
    /// Quantity.
    pub quantity: u32,
    /// Quantity before staff modification.
    pub original_quantity: Option<u32>,
    /// Unit price times quantity, in minor units.
    pub subtotal: u64,
}

/// Order data sent to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Session that placed the order.
    pub session: SessionId,
    /// Customer name.
    pub customer_name: String,
    /// Customer phone number.
    pub customer_phone: String,
    /// Delivery location.
    pub delivery_address: String,
    /// Requested spice level.
    pub spice_level: SpiceLevel,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Public reference to the uploaded payment slip.
    pub payment_evidence: Option<String>,
    /// Sum of line subtotals in minor units.
    pub subtotal: u64,
    /// Volume discount in minor units.
    pub discount: u64,
    /// Amount due in minor units.
    pub total: u64,
    /// Free-text customer notes.
    pub notes: String,
    /// Lifecycle status.
    pub status: OrderStatus,
}

/// Order line data sent to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    /// Owning order.
    pub order_id: OrderUuid,
    /// Menu item the line was ordered from.
    pub menu_item_id: MenuItemUuid,
    /// Name at the time of ordering.
    pub name: String,
    /// Unit price at the time of ordering, in minor units.
    pub unit_price: u64,
    /// Quantity.
    pub quantity: u32,
    /// Unit price times quantity, in minor units.
    pub subtotal: u64,
}

impl NewOrderItem {
    /// Snapshot a cart line as a line of `order`. Returns `None` if the line
    /// subtotal overflows.
    pub fn snapshot(order: OrderUuid, item: &CartItem) -> Option<Self> {
        Some(Self {
            order_id: order,
            menu_item_id: item.id(),
            name: item.name().to_string(),
            unit_price: item.unit_price(),
            quantity: item.quantity(),
            subtotal: item.unit_price().checked_mul(u64::from(item.quantity()))?,
        })
    }
}

/// An order together with its lines, as last received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    /// The order.
    pub order: Order,
    /// Its lines.
    pub items: Vec<OrderItem>,
}
