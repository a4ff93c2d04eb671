//! Menu Items

use crate::{cart::CartProduct, uuids::TypedUuid};

/// Menu item identifier.
pub type MenuItemUuid = TypedUuid<MenuItem>;

/// A menu item as published by the venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Identifier.
    pub id: MenuItemUuid,
    /// Display name.
    pub name: String,
    /// Secondary-language name.
    pub localized_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Price in minor units.
    pub price: u64,
    /// Public image reference.
    pub image_reference: Option<String>,
    /// Menu section.
    pub category: Option<String>,
    /// Whether the item can currently be ordered.
    pub is_available: bool,
}

impl From<&MenuItem> for CartProduct {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            localized_name: item.localized_name.clone(),
            unit_price: item.price,
            image_reference: item.image_reference.clone(),
        }
    }
}
