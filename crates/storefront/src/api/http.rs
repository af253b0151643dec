//! `reqwest` implementation of [`CommerceApi`].

use std::sync::Arc;

use orebi_core::{OrderId, ProductId, UserId};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    AddItemResponse, CartRecord, Category, CouponResponse, CustomerDetails, OrderRecord,
    PaymentSession, PaymentStatusRecord, PlaceOrderRequest, ProductQuery, RawProduct, Tag,
};
use super::{ApiError, CommerceApi};
use crate::config::ClientConfig;

/// Maximum number of body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// =============================================================================
// HttpApi
// =============================================================================

/// Backend client over HTTP.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    /// Build an absolute URL from path segments and query pairs.
    ///
    /// Segments are percent-encoded, so ids can never escape their slot.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.inner.base_url.clone();
        let path = segments
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/{path}"));

        if query.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(query);
        }
        url
    }

    /// Send a request and return the response body of a successful call.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        token: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = response_text.chars().take(ERROR_BODY_LIMIT).collect::<String>();
            tracing::warn!(status = %status, body = %message, "Backend returned non-success status");

            return Err(match status.as_u16() {
                code @ (401 | 403) => ApiError::Authorization {
                    status: code,
                    message,
                },
                code => ApiError::Http {
                    status: code,
                    message,
                },
            });
        }

        Ok(response_text)
    }

    /// Send a request and decode its JSON response.
    async fn fetch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        token: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response_text = self.send(method, url, token, body).await?;

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.fetch::<T, ()>(Method::GET, url, token, None).await
    }
}

impl CommerceApi for HttpApi {
    // =========================================================================
    // Catalog
    // =========================================================================

    #[instrument(skip(self), fields(query = ?query))]
    async fn get_products(&self, query: &ProductQuery) -> Result<Vec<RawProduct>, ApiError> {
        let url = self.url(&["api", "products"], &query.to_pairs());
        let products: Vec<RawProduct> = self.get(url, None).await?;
        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<RawProduct, ApiError> {
        let url = self.url(&["api", "products", id.as_str()], &[]);
        self.get(url, None).await
    }

    #[instrument(skip(self))]
    async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.url(&["api", "categories"], &[]);
        self.get(url, None).await
    }

    #[instrument(skip(self))]
    async fn get_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let url = self.url(&["api", "tags"], &[]);
        self.get(url, None).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn get_cart(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<CartRecord, ApiError> {
        let url = self.url(&["api", "cart", user.as_str()], &[]);
        self.get(url, Some(token))
            .await
            .map_err(|e| e.cart_not_found(user))
    }

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn create_cart(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<CartRecord, ApiError> {
        let url = self.url(&["api", "cart"], &[]);
        let body = serde_json::json!({ "userId": user, "items": [] });
        self.fetch(Method::POST, url, Some(token), Some(&body)).await
    }

    #[instrument(skip(self, token), fields(user_id = %user, product_id = %product_id))]
    async fn add_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<AddItemResponse, ApiError> {
        let url = self.url(
            &["api", "cart", user.as_str(), "items"],
            &[
                ("productId", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ],
        );
        let response_text = self
            .send::<()>(Method::POST, url, Some(token), None)
            .await
            .map_err(|e| e.cart_not_found(user))?;

        // Some deployments answer with an empty body
        if response_text.trim().is_empty() {
            return Ok(AddItemResponse::default());
        }
        serde_json::from_str(&response_text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    #[instrument(skip(self, token), fields(user_id = %user, item_id = %item_id))]
    async fn update_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let url = self.url(
            &["api", "cart", user.as_str(), "items", item_id],
            &[("quantity", quantity.to_string())],
        );
        self.send::<()>(Method::PUT, url, Some(token), None).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %user, item_id = %item_id))]
    async fn remove_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&["api", "cart", user.as_str(), "items", item_id], &[]);
        self.send::<()>(Method::DELETE, url, Some(token), None).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn delete_cart(&self, user: &UserId, token: &SecretString) -> Result<(), ApiError> {
        let url = self.url(&["api", "cart", user.as_str()], &[]);
        self.send::<()>(Method::DELETE, url, Some(token), None).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn apply_coupon(
        &self,
        user: &UserId,
        token: &SecretString,
        code: &str,
    ) -> Result<CouponResponse, ApiError> {
        let url = self.url(&["api", "cart", user.as_str(), "coupon"], &[]);
        let body = serde_json::json!({ "couponCode": code });
        self.fetch(Method::POST, url, Some(token), Some(&body)).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    #[instrument(skip(self, token, request), fields(user_id = %user, items = request.items.len()))]
    async fn place_order(
        &self,
        user: &UserId,
        token: &SecretString,
        request: &PlaceOrderRequest,
    ) -> Result<OrderRecord, ApiError> {
        let url = self.url(&["api", "orders", "place", user.as_str()], &[]);
        self.fetch(Method::POST, url, Some(token), Some(request))
            .await
    }

    #[instrument(skip(self, token), fields(order_id = %order_id, user_id = %user))]
    async fn get_order(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<OrderRecord, ApiError> {
        let url = self.url(
            &["api", "orders", order_id.as_str(), "user", user.as_str()],
            &[],
        );
        self.get(url, Some(token)).await
    }

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn get_user_orders(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<OrderRecord>, ApiError> {
        let url = self.url(&["api", "orders", "user", user.as_str()], &[]);
        self.get(url, Some(token)).await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    #[instrument(skip(self, token, customer), fields(order_id = %order_id, user_id = %user))]
    async fn initiate_payment(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
        customer: &CustomerDetails,
    ) -> Result<PaymentSession, ApiError> {
        let url = self.url(
            &["api", "payments", "initiate", order_id.as_str()],
            &[("userId", user.to_string())],
        );
        self.fetch(Method::POST, url, Some(token), Some(customer))
            .await
    }

    #[instrument(skip(self, token), fields(order_id = %order_id, user_id = %user))]
    async fn get_payment_status(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<PaymentStatusRecord, ApiError> {
        let url = self.url(
            &["api", "payments", "status", order_id.as_str()],
            &[("userId", user.to_string())],
        );
        self.get(url, Some(token)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        let config = ClientConfig {
            api_base_url: Url::parse(base).unwrap(),
            ..ClientConfig::default()
        };
        HttpApi::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_segments() {
        let api = api("http://localhost:9000");
        let url = api.url(&["api", "cart", "7", "items"], &[]);
        assert_eq!(url.as_str(), "http://localhost:9000/api/cart/7/items");
    }

    #[test]
    fn test_url_keeps_base_path() {
        let api = api("https://shop.example.com/backend/");
        let url = api.url(&["api", "tags"], &[]);
        assert_eq!(url.as_str(), "https://shop.example.com/backend/api/tags");
    }

    #[test]
    fn test_url_encodes_segments_and_query() {
        let api = api("http://localhost:9000");
        let url = api.url(
            &["api", "products", "a/b"],
            &[("categoryIds", "1,2".to_string())],
        );
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/api/products/a%2Fb?categoryIds=1%2C2"
        );
    }
}
