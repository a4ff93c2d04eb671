//! Checkout
//!
//! The pure half of order submission: validating the customer's form against
//! the cart, and turning a validated form plus priced cart into the records
//! sent to the store. Nothing here performs I/O.

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    cart::CartItem,
    discounts::Totals,
    orders::{NewOrder, NewOrderItem, OrderStatus, OrderUuid, PaymentMethod, SpiceLevel},
    session::SessionId,
};

/// A form problem that stops submission before anything is sent.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing to order.
    #[error("Your cart is empty.")]
    EmptyCart,

    /// Customer name is blank.
    #[error("Please enter your name.")]
    MissingName,

    /// Customer phone is blank.
    #[error("Please enter your phone number.")]
    MissingPhone,

    /// A custom delivery location was chosen but left blank.
    #[error("Please enter a delivery location.")]
    MissingDeliveryAddress,

    /// Slip payment was chosen without attaching the slip.
    #[error("Please attach your payment slip.")]
    MissingEvidence,
}

/// Amounts that cannot be represented in an order record.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// A total was negative.
    #[error("order amount is negative")]
    NegativeAmount,

    /// A line subtotal overflowed.
    #[error("line subtotal overflowed")]
    LineOverflow,
}

/// Where the order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryLocation {
    /// The HashTag bar.
    #[default]
    HashTag,
    /// Replay.
    Replay,
    /// Be-to-Sit.
    BeToSit,
    /// Phrom Mit.
    PhromMit,
    /// Alone.
    Alone,
    /// Behind the university.
    LangMo,
    /// A free-text address.
    Other(String),
}

impl DeliveryLocation {
    /// The address stored on the order.
    pub fn address(&self) -> &str {
        match self {
            Self::HashTag => "ร้าน HashTag(#)",
            Self::Replay => "Replay",
            Self::BeToSit => "Be-to-Sit",
            Self::PhromMit => "พร้อมมิตร",
            Self::Alone => "อโลน",
            Self::LangMo => "หลังมอ",
            Self::Other(address) => address.trim(),
        }
    }
}

/// An attached payment slip image.
#[derive(Clone, PartialEq, Eq)]
pub struct Evidence {
    /// Original file name.
    pub file_name: String,

    /// MIME type of `bytes`.
    pub content_type: String,

    /// Image contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evidence")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Evidence {
    /// Object name for the upload: session, millisecond timestamp and the
    /// original file name, joined by underscores.
    pub fn object_name(&self, session: &SessionId, now: Timestamp) -> String {
        format!("{session}_{}_{}", now.as_millisecond(), self.file_name)
    }
}

/// Customer details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutForm {
    /// Customer name.
    pub customer_name: String,
    /// Customer phone number.
    pub customer_phone: String,
    /// Delivery location.
    pub delivery: DeliveryLocation,
    /// Requested spice level.
    pub spice_level: SpiceLevel,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Free-text notes for the kitchen.
    pub notes: String,
    /// Payment slip, required for [`PaymentMethod::Slip`].
    pub evidence: Option<Evidence>,
}

impl CheckoutForm {
    /// Check the form against the cart, reporting the first problem found.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] that applies.
    pub fn validate(&self, cart: &[CartItem]) -> Result<(), ValidationError> {
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        if self.customer_name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }

        if self.customer_phone.trim().is_empty() {
            return Err(ValidationError::MissingPhone);
        }

        if self.delivery.address().is_empty() {
            return Err(ValidationError::MissingDeliveryAddress);
        }

        if self.payment_method.requires_evidence() && self.evidence.is_none() {
            return Err(ValidationError::MissingEvidence);
        }

        Ok(())
    }

    /// Build the pending order record.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NegativeAmount`] if any total is negative.
    pub fn new_order(
        &self,
        session: SessionId,
        totals: &Totals<'_>,
        payment_evidence: Option<String>,
    ) -> Result<NewOrder, SnapshotError> {
        Ok(NewOrder {
            session,
            customer_name: self.customer_name.trim().to_string(),
            customer_phone: self.customer_phone.trim().to_string(),
            delivery_address: self.delivery.address().to_string(),
            spice_level: self.spice_level,
            payment_method: self.payment_method,
            payment_evidence,
            subtotal: minor_units(&totals.subtotal)?,
            discount: minor_units(&totals.discount)?,
            total: minor_units(&totals.total)?,
            notes: self.notes.trim().to_string(),
            status: OrderStatus::Pending,
        })
    }
}

/// Snapshot every cart line as a line of `order`.
///
/// # Errors
///
/// Returns [`SnapshotError::LineOverflow`] if a line subtotal overflows.
pub fn order_items(order: OrderUuid, cart: &[CartItem]) -> Result<Vec<NewOrderItem>, SnapshotError> {
    cart.iter()
        .map(|item| NewOrderItem::snapshot(order, item).ok_or(SnapshotError::LineOverflow))
        .collect()
}

fn minor_units(money: &Money<'_, Currency>) -> Result<u64, SnapshotError> {
    u64::try_from(money.to_minor_units())
        .ok()
        .ok_or(SnapshotError::NegativeAmount)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{discounts::DiscountSchedule, uuids::TypedUuid};

    use super::*;

    fn cart() -> Vec<CartItem> {
        vec![
            CartItem::new(TypedUuid::now_v7(), "Pork", None, 15_00, 9, None),
            CartItem::new(TypedUuid::now_v7(), "Tofu", None, 20_00, 1, None),
        ]
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            customer_name: " Somchai ".to_string(),
            customer_phone: "0812345678".to_string(),
            payment_method: PaymentMethod::Cash,
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn valid_cash_form_passes() {
        assert_eq!(form().validate(&cart()), Ok(()));
    }

    #[test]
    fn empty_cart_is_rejected_first() {
        let form = CheckoutForm::default();

        assert_eq!(form.validate(&[]), Err(ValidationError::EmptyCart));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let cart = cart();

        let blank_name = CheckoutForm {
            customer_name: "   ".to_string(),
            ..form()
        };
        let blank_phone = CheckoutForm {
            customer_phone: String::new(),
            ..form()
        };
        let blank_address = CheckoutForm {
            delivery: DeliveryLocation::Other("  ".to_string()),
            ..form()
        };

        assert_eq!(blank_name.validate(&cart), Err(ValidationError::MissingName));
        assert_eq!(blank_phone.validate(&cart), Err(ValidationError::MissingPhone));
        assert_eq!(
            blank_address.validate(&cart),
            Err(ValidationError::MissingDeliveryAddress)
        );
    }

    #[test]
    fn slip_payment_needs_evidence() {
        let cart = cart();
        let mut form = CheckoutForm {
            payment_method: PaymentMethod::Slip,
            ..form()
        };

        assert_eq!(form.validate(&cart), Err(ValidationError::MissingEvidence));

        form.evidence = Some(Evidence {
            file_name: "slip.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8],
        });

        assert_eq!(form.validate(&cart), Ok(()));
    }

    #[test]
    fn evidence_object_name_embeds_session_and_time() -> TestResult {
        let evidence = Evidence {
            file_name: "slip.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: Vec::new(),
        };

        let name = evidence.object_name(
            &SessionId::new("session_1_abc"),
            Timestamp::from_millisecond(1_700_000_000_123)?,
        );

        assert_eq!(name, "session_1_abc_1700000000123_slip.jpg");

        Ok(())
    }

    #[test]
    fn new_order_carries_totals_and_pending_status() -> TestResult {
        let cart = cart();
        let totals = DiscountSchedule::standard(iso::THB).totals(&cart)?;

        let order = form().new_order(SessionId::new("s1"), &totals, None)?;

        assert_eq!(order.customer_name, "Somchai");
        assert_eq!(order.delivery_address, "ร้าน HashTag(#)");
        assert_eq!(order.subtotal, 155_00);
        assert_eq!(order.discount, 10_00);
        assert_eq!(order.total, 145_00);
        assert_eq!(order.status, OrderStatus::Pending);

        Ok(())
    }

    #[test]
    fn order_items_snapshot_every_line() -> TestResult {
        let cart = cart();
        let order = TypedUuid::now_v7();

        let items = order_items(order, &cart)?;

        let subtotals: Vec<u64> = items.iter().map(|item| item.subtotal).collect();

        assert_eq!(subtotals, vec![135_00, 20_00]);
        assert!(items.iter().all(|item| item.order_id == order));

        Ok(())
    }
}
