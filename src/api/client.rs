// src/api/client.rs
//! Thin HTTP client for the Notion REST API.
//!
//! Handles authentication headers, query parameters and body extraction;
//! decoding lives in [`super::parser`].

use super::pagination::{fetch_all_pages, page_body, page_query};
use super::parser::parse_api_response;
use super::responses::{PaginatedResponse, PropertyItem, RawPage, SearchObject};
use crate::error::AppError;
use crate::types::{ApiKey, DatabaseId, NotionId, PageId};
use reqwest::{header, Client, Response};
use serde::Serialize;
use serde_json::Value;

const NOTION_VERSION: &str = "2022-06-28";
pub const API_BASE_URL: &str = "https://api.notion.com/v1";

/// Authenticated reqwest client bound to one API key.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    pub fn with_base_url(api_key: &ApiKey, base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );
        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// The underlying client, for callers that want to own the response.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// GET `endpoint` (relative to the base URL) with query parameters.
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, query);
        Ok(self.client.get(url).query(query).send().await?)
    }

    /// POST `endpoint` with a JSON body.
    pub async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("POST {}", url);
        Ok(self.client.post(url).json(body).send().await?)
    }

    async fn get_page_of<T>(
        &self,
        endpoint: &str,
        page_size: usize,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<T>, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .get(endpoint, &page_query(page_size, cursor.as_deref()))
            .await?;
        parse_api_response(extract_response_text(response).await?)
    }

    async fn post_page_of<T>(
        &self,
        endpoint: &str,
        page_size: usize,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<T>, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .post(endpoint, &page_body(page_size, cursor.as_deref()))
            .await?;
        parse_api_response(extract_response_text(response).await?)
    }
}

#[async_trait::async_trait]
impl super::NotionRepository for NotionHttpClient {
    async fn search(&self) -> Result<Vec<SearchObject>, AppError> {
        fetch_all_pages(move |page_size, cursor| self.post_page_of("search", page_size, cursor)).await
    }

    async fn query_database(&self, database: &DatabaseId) -> Result<Vec<RawPage>, AppError> {
        let endpoint = format!("databases/{}/query", database.to_dashed());
        let endpoint = endpoint.as_str();
        fetch_all_pages(move |page_size, cursor| self.post_page_of(endpoint, page_size, cursor)).await
    }

    async fn block_children(&self, parent: &NotionId) -> Result<Vec<Value>, AppError> {
        let endpoint = format!("blocks/{}/children", parent.to_hyphenated());
        let endpoint = endpoint.as_str();
        fetch_all_pages(move |page_size, cursor| self.get_page_of(endpoint, page_size, cursor)).await
    }

    async fn property_items(
        &self,
        page: &PageId,
        property_id: &str,
    ) -> Result<Vec<PropertyItem>, AppError> {
        let endpoint = format!("pages/{}/properties/{}", page.to_dashed(), property_id);
        let endpoint = endpoint.as_str();
        fetch_all_pages(move |page_size, cursor| self.get_page_of(endpoint, page_size, cursor)).await
    }
}

/// Response body with the metadata needed to decode it.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub url: String,
}

pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
