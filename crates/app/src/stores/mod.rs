//! Remote record and blob stores.
//!
//! The hosted backend owns menu items, orders and order lines, and stores
//! uploaded images. Everything else in the app talks to it through these two
//! traits so the submission workflow can be exercised against mocks.

use async_trait::async_trait;
use mala::{
    menu::{MenuItem, MenuItemUuid},
    orders::{NewOrder, NewOrderItem, Order, OrderItem, OrderUuid},
};
use mockall::automock;

mod errors;
mod rows;
mod supabase;

pub use errors::StoreError;
pub use supabase::{SupabaseClient, SupabaseConfig};

#[automock]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All menu items, available or not.
    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, StoreError>;

    /// A single menu item.
    async fn get_menu_item(&self, id: MenuItemUuid) -> Result<MenuItem, StoreError>;

    /// Create an order and return it with its generated id.
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// A single order.
    async fn get_order(&self, id: OrderUuid) -> Result<Order, StoreError>;

    /// The given orders, newest first. Unknown ids are skipped.
    async fn get_orders(&self, ids: Vec<OrderUuid>) -> Result<Vec<Order>, StoreError>;

    /// Create order lines in one request.
    async fn create_order_items(
        &self,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, StoreError>;

    /// Lines of an order.
    async fn get_order_items(&self, order: OrderUuid) -> Result<Vec<OrderItem>, StoreError>;
}

#[automock]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` to `bucket` under `path`, returning its public reference.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;
}
