//! Hosted backend client.
//!
//! Records go through the REST interface under `/rest/v1`, images through the
//! object storage interface under `/storage/v1`.

use async_trait::async_trait;
use mala::{
    menu::{MenuItem, MenuItemUuid},
    orders::{NewOrder, NewOrderItem, Order, OrderItem, OrderUuid},
};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    BlobStore, RecordStore, StoreError,
    rows::{Amounts, MenuItemRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow},
};

/// Configuration for connecting to the hosted backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project address, e.g. `"https://abc.supabase.co"`.
    pub url: String,

    /// Public anonymous API key.
    pub anon_key: String,
}

/// HTTP client implementing [`RecordStore`] and [`BlobStore`].
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: Client,
    amounts: Amounts,
}

impl SupabaseClient {
    /// Create a new client. `currency_exponent` is the number of minor-unit
    /// digits of the shop currency, used to convert stored prices.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidUrl`] if the configured address is not an
    /// absolute http(s) URL.
    pub fn new(config: SupabaseConfig, currency_exponent: u32) -> Result<Self, StoreError> {
        let url = config.url.trim_end_matches('/').to_string();

        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(StoreError::InvalidUrl(config.url));
        }

        Ok(Self {
            config: SupabaseConfig { url, ..config },
            http: Client::new(),
            amounts: Amounts::new(currency_exponent),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/rest/v1/{name}", self.config.url)
    }

    /// Object storage address with `bucket` and each part of `path` encoded
    /// as its own segment.
    fn object_url(&self, prefix: &[&str], bucket: &str, path: &str) -> Result<Url, StoreError> {
        let mut url =
            Url::parse(&self.config.url).map_err(|_| StoreError::InvalidUrl(self.config.url.clone()))?;

        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidUrl(self.config.url.clone()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(prefix)
            .push(bucket)
            .extend(path.split('/'));

        Ok(url)
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String, StoreError> {
        Ok(self.object_url(&["public"], bucket, path)?.into())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .authorized(self.http.get(self.table(table)))
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await?;

        parse(response, table).await
    }

    async fn insert<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .authorized(self.http.post(self.table(table)))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        parse(response, table).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response, table: &str) -> Result<Vec<T>, StoreError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        return Err(StoreError::UnexpectedResponse(format!(
            "{table} request failed with status {status}: {text}"
        )));
    }

    Ok(response.json().await?)
}

fn in_filter(ids: &[OrderUuid]) -> String {
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();

    format!("in.({})", ids.join(","))
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, StoreError> {
        let rows: Vec<MenuItemRow> = self
            .select("menu_items", &[("order", "name.asc".to_string())])
            .await?;

        rows.into_iter()
            .map(|row| row.into_model(self.amounts))
            .collect()
    }

    async fn get_menu_item(&self, id: MenuItemUuid) -> Result<MenuItem, StoreError> {
        let rows: Vec<MenuItemRow> = self
            .select("menu_items", &[("id", format!("eq.{id}"))])
            .await?;

        rows.into_iter()
            .next()
            .ok_or(StoreError::NotFound)?
            .into_model(self.amounts)
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let row = NewOrderRow::from_model(order, self.amounts)?;
        let rows: Vec<OrderRow> = self.insert("orders", &row).await?;

        let order = rows
            .into_iter()
            .next()
            .ok_or_else(|| {
                StoreError::UnexpectedResponse("order insert returned no rows".to_string())
            })?
            .into_model(self.amounts)?;

        debug!(order = %order.id, "created order");

        Ok(order)
    }

    async fn get_order(&self, id: OrderUuid) -> Result<Order, StoreError> {
        let rows: Vec<OrderRow> = self
            .select("orders", &[("id", format!("eq.{id}"))])
            .await?;

        rows.into_iter()
            .next()
            .ok_or(StoreError::NotFound)?
            .into_model(self.amounts)
    }

    async fn get_orders(&self, ids: Vec<OrderUuid>) -> Result<Vec<Order>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<OrderRow> = self
            .select(
                "orders",
                &[
                    ("id", in_filter(&ids)),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;

        rows.into_iter()
            .map(|row| row.into_model(self.amounts))
            .collect()
    }

    async fn create_order_items(
        &self,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, StoreError> {
        let rows = items
            .into_iter()
            .map(|item| NewOrderItemRow::from_model(item, self.amounts))
            .collect::<Result<Vec<_>, _>>()?;

        let created: Vec<OrderItemRow> = self.insert("order_items", &rows).await?;

        created
            .into_iter()
            .map(|row| row.into_model(self.amounts))
            .collect()
    }

    async fn get_order_items(&self, order: OrderUuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows: Vec<OrderItemRow> = self
            .select("order_items", &[("order_id", format!("eq.{order}"))])
            .await?;

        rows.into_iter()
            .map(|row| row.into_model(self.amounts))
            .collect()
    }
}

#[async_trait]
impl BlobStore for SupabaseClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = self.object_url(&[], bucket, path)?;

        let response = self
            .authorized(self.http.post(url))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(StoreError::UnexpectedResponse(format!(
                "upload failed with status {status}: {text}"
            )));
        }

        debug!(bucket, path, "uploaded object");

        self.public_url(bucket, path)
    }
}
