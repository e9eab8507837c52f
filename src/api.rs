//! Client for the hosted backend.
//!
//! Every call is an independent blocking request. Nothing is retried.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::model::{
    Booking, BookingItem, CatalogItem, CatalogItemUpdate, Lead, NewBooking, NewBookingItem,
    NewCatalogItem, NewLead, Shop, ShopUpdate,
};

/// Backend resources the app works with.
pub trait Backend {
    fn list_bookings(&self, shop_id: i64) -> ApiResult<Vec<Booking>>;
    fn get_booking(&self, id: i64) -> ApiResult<Booking>;
    fn create_booking(&self, booking: &NewBooking) -> ApiResult<Booking>;
    fn delete_booking(&self, id: i64) -> ApiResult<()>;

    fn add_booking_item(&self, item: &NewBookingItem) -> ApiResult<BookingItem>;
    fn update_booking_item_meta(&self, item_id: i64, meta: &Value) -> ApiResult<BookingItem>;

    fn list_items(&self, shop_id: i64) -> ApiResult<Vec<CatalogItem>>;
    fn create_item(&self, item: &NewCatalogItem) -> ApiResult<CatalogItem>;
    fn update_item(&self, id: i64, update: &CatalogItemUpdate) -> ApiResult<CatalogItem>;
    fn delete_item(&self, id: i64) -> ApiResult<()>;

    fn list_leads(&self, shop_id: i64) -> ApiResult<Vec<Lead>>;
    fn create_lead(&self, lead: &NewLead) -> ApiResult<Lead>;

    fn get_shop(&self, id: i64) -> ApiResult<Shop>;
    fn update_shop(&self, id: i64, update: &ShopUpdate) -> ApiResult<Shop>;
}

/// HTTP client for the hosted REST backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, i64)]) -> ApiResult<T> {
        debug!(path, "GET");
        let request = self.client.get(self.url(path)).query(query);
        let response = self.authorize(request).send()?;
        Self::handle_response(response)?.json().map_err(Into::into)
    }

    fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        debug!(path, "POST");
        let request = self.client.post(self.url(path)).json(body);
        let response = self.authorize(request).send()?;
        Self::handle_response(response)?.json().map_err(Into::into)
    }

    fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        debug!(path, "PATCH");
        let request = self.client.patch(self.url(path)).json(body);
        let response = self.authorize(request).send()?;
        Self::handle_response(response)?.json().map_err(Into::into)
    }

    fn delete(&self, path: &str) -> ApiResult<()> {
        debug!(path, "DELETE");
        let request = self.client.delete(self.url(path));
        let response = self.authorize(request).send()?;
        Self::handle_response(response).map(|_| ())
    }

    /// Map non-success statuses to errors, passing successful responses through.
    fn handle_response(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text()?;
        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(text),
            StatusCode::NOT_FOUND => ApiError::NotFound(text),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(text),
            _ => ApiError::Backend {
                status: status.as_u16(),
                body: text,
            },
        })
    }
}

impl Backend for HttpBackend {
    fn list_bookings(&self, shop_id: i64) -> ApiResult<Vec<Booking>> {
        self.get("booking", &[("shop_id", shop_id)])
    }

    fn get_booking(&self, id: i64) -> ApiResult<Booking> {
        self.get(&format!("booking/{}", id), &[])
    }

    fn create_booking(&self, booking: &NewBooking) -> ApiResult<Booking> {
        self.post("booking", booking)
    }

    fn delete_booking(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("booking/{}", id))
    }

    fn add_booking_item(&self, item: &NewBookingItem) -> ApiResult<BookingItem> {
        self.post("booking_item", item)
    }

    fn update_booking_item_meta(&self, item_id: i64, meta: &Value) -> ApiResult<BookingItem> {
        self.patch(&format!("booking_item/{}", item_id), &json!({ "meta": meta }))
    }

    fn list_items(&self, shop_id: i64) -> ApiResult<Vec<CatalogItem>> {
        self.get("item", &[("shop_id", shop_id)])
    }

    fn create_item(&self, item: &NewCatalogItem) -> ApiResult<CatalogItem> {
        self.post("item", item)
    }

    fn update_item(&self, id: i64, update: &CatalogItemUpdate) -> ApiResult<CatalogItem> {
        self.patch(&format!("item/{}", id), update)
    }

    fn delete_item(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("item/{}", id))
    }

    fn list_leads(&self, shop_id: i64) -> ApiResult<Vec<Lead>> {
        self.get("lead", &[("shop_id", shop_id)])
    }

    fn create_lead(&self, lead: &NewLead) -> ApiResult<Lead> {
        self.post("lead", lead)
    }

    fn get_shop(&self, id: i64) -> ApiResult<Shop> {
        self.get(&format!("shop/{}", id), &[])
    }

    fn update_shop(&self, id: i64, update: &ShopUpdate) -> ApiResult<Shop> {
        self.patch(&format!("shop/{}", id), update)
    }
}
