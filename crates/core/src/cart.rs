//! Cart
//!
//! The device's cart is an ordered list of lines keyed by menu item id, kept in
//! the order items were first added. Every mutation is written through to
//! storage before it returns, then announced to subscribers so co-resident
//! displays (cart badges, totals) can refresh.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::debug;

use crate::{
    discounts::{DiscountSchedule, Totals, TotalsError},
    menu::MenuItemUuid,
    storage::{Storage, StorageError, keys, read_json, write_json},
};

/// Errors raised by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Reading or writing the cart failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A quantity fell outside the representable range.
    #[error("quantity for item {0} is out of range")]
    QuantityOutOfRange(MenuItemUuid),

    /// Pricing the cart failed.
    #[error(transparent)]
    Totals(#[from] TotalsError),
}

/// A product as offered for adding to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    /// Menu item identifier.
    pub id: MenuItemUuid,

    /// Display name.
    pub name: String,

    /// Optional secondary-language name.
    pub localized_name: Option<String>,

    /// Unit price in minor units.
    pub unit_price: u64,

    /// Optional image reference.
    pub image_reference: Option<String>,
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    id: MenuItemUuid,
    name: String,
    localized_name: Option<String>,
    unit_price: u64,
    quantity: u32,
    image_reference: Option<String>,
}

impl CartItem {
    /// Create a cart line.
    pub fn new(
        id: MenuItemUuid,
        name: impl Into<String>,
        localized_name: Option<String>,
        unit_price: u64,
        quantity: u32,
        image_reference: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            localized_name,
            unit_price,
            quantity,
            image_reference,
        }
    }

    /// Menu item identifier.
    pub const fn id(&self) -> MenuItemUuid {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Secondary-language name, if any.
    pub fn localized_name(&self) -> Option<&str> {
        self.localized_name.as_deref()
    }

    /// Unit price in minor units.
    pub const fn unit_price(&self) -> u64 {
        self.unit_price
    }

    /// Quantity, always at least one.
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Image reference, if any.
    pub fn image_reference(&self) -> Option<&str> {
        self.image_reference.as_deref()
    }

    /// Unit price times quantity in minor units, or `None` on overflow.
    pub fn line_subtotal_minor(&self) -> Option<i64> {
        i64::try_from(self.unit_price)
            .ok()?
            .checked_mul(i64::from(self.quantity))
    }
}

impl From<CartProduct> for CartItem {
    fn from(product: CartProduct) -> Self {
        Self {
            id: product.id,
            name: product.name,
            localized_name: product.localized_name,
            unit_price: product.unit_price,
            quantity: 1,
            image_reference: product.image_reference,
        }
    }
}

/// A committed cart mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// An item was added or its quantity incremented.
    Added {
        /// Item that was added.
        id: MenuItemUuid,

        /// Quantity after the add.
        quantity: u32,
    },

    /// An item's quantity was set.
    QuantityChanged {
        /// Item that changed.
        id: MenuItemUuid,

        /// New quantity.
        quantity: u32,
    },

    /// An item was removed.
    Removed {
        /// Item that was removed.
        id: MenuItemUuid,
    },

    /// The cart was emptied.
    Cleared,
}

new_key_type! {
    /// Handle returned by [`CartStore::subscribe`].
    pub struct SubscriptionKey;
}

type Subscriber = Arc<dyn Fn(&CartEvent) + Send + Sync>;

/// The persisted cart for the current device.
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn Storage>,
    subscribers: Arc<Mutex<SlotMap<SubscriptionKey, Subscriber>>>,
}

impl Debug for CartStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();

        f.debug_struct("CartStore")
            .field("storage", &self.storage)
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl CartStore {
    /// Create a cart over the given storage.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            subscribers: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Current cart lines in add order; empty if the cart was never written.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the cart cannot be read or decoded.
    pub fn read(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(read_json(self.storage.as_ref(), keys::CART)?.unwrap_or_default())
    }

    /// Add one of `product`, appending a new line or incrementing an existing one.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if storage fails or the quantity would overflow.
    pub fn add(&self, product: CartProduct) -> Result<(), CartError> {
        let mut items = self.read()?;
        let id = product.id;

        let quantity = if let Some(existing) = items.iter_mut().find(|item| item.id == id) {
            existing.quantity = existing
                .quantity
                .checked_add(1)
                .ok_or(CartError::QuantityOutOfRange(id))?;

            existing.quantity
        } else {
            items.push(CartItem::from(product));

            1
        };

        self.commit(&items, CartEvent::Added { id, quantity })
    }

    /// Set the quantity of an existing line. A quantity of zero or less removes
    /// the line; an unknown id is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if storage fails or `quantity` exceeds the supported range.
    pub fn set_quantity(&self, id: MenuItemUuid, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove(id);
        }

        let quantity = u32::try_from(quantity)
            .ok()
            .ok_or(CartError::QuantityOutOfRange(id))?;

        let mut items = self.read()?;

        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(());
        };

        item.quantity = quantity;

        self.commit(&items, CartEvent::QuantityChanged { id, quantity })
    }

    /// Remove a line. Removing an absent id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the cart cannot be read or written.
    pub fn remove(&self, id: MenuItemUuid) -> Result<(), CartError> {
        let mut items = self.read()?;
        let before = items.len();

        items.retain(|item| item.id != id);

        if items.len() == before {
            return Ok(());
        }

        self.commit(&items, CartEvent::Removed { id })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the cart cannot be removed from storage.
    pub fn clear(&self) -> Result<(), CartError> {
        self.storage.remove(keys::CART)?;

        debug!("cart cleared");

        self.notify(&CartEvent::Cleared);

        Ok(())
    }

    /// Total quantity across all lines.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be read or the count overflows.
    pub fn item_count(&self) -> Result<u32, CartError> {
        self.read()?.iter().try_fold(0_u32, |count, item| {
            count
                .checked_add(item.quantity)
                .ok_or(CartError::QuantityOutOfRange(item.id))
        })
    }

    /// Price the current cart against `schedule`.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be read or priced.
    pub fn totals<'a>(&self, schedule: &DiscountSchedule<'a>) -> Result<Totals<'a>, CartError> {
        Ok(schedule.totals(&self.read()?)?)
    }

    /// Register a callback fired after every committed mutation.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionKey
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::new(callback))
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    fn commit(&self, items: &[CartItem], event: CartEvent) -> Result<(), CartError> {
        write_json(self.storage.as_ref(), keys::CART, items)?;

        debug!(?event, lines = items.len(), "cart updated");

        self.notify(&event);

        Ok(())
    }

    fn notify(&self, event: &CartEvent) {
        // Callbacks run unlocked so they may read the cart or (un)subscribe.
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for subscriber in subscribers {
            subscriber(event);
        }
    }
}
