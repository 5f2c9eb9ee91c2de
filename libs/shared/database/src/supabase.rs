use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::{DatabaseError, PostgrestErrorBody};

const REST_PREFIX: &str = "/rest/v1";

/// Thin PostgREST client. Every call authenticates with the service key; the
/// API layer enforces roles before anything reaches storage.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|_| DatabaseError::Auth("Service key contains invalid characters".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|_| DatabaseError::Auth("Service key contains invalid characters".to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            let parsed = PostgrestErrorBody::parse(&error_text);

            return Err(match status.as_u16() {
                401 | 403 => DatabaseError::Auth(parsed.describe()),
                404 => DatabaseError::NotFound(parsed.describe()),
                409 => DatabaseError::Conflict {
                    code: parsed.code.clone(),
                    message: parsed.describe(),
                },
                code => DatabaseError::Api { status: code, message: parsed.describe() },
            });
        }

        let bytes = response.bytes().await?;
        let data = if bytes.is_empty() {
            serde_json::from_value(Value::Null)?
        } else {
            serde_json::from_slice::<T>(&bytes)?
        };
        Ok(data)
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// `GET /rest/v1/{table}?{query}`.
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>, DatabaseError>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request(Method::GET, &path, None).await
    }

    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>, DatabaseError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.select(table, query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn exists(&self, table: &str, filter: &str) -> Result<bool, DatabaseError> {
        let query = format!("select=id&{}&limit=1", filter);
        let rows: Vec<Value> = self.select(table, &query).await?;
        Ok(!rows.is_empty())
    }

    /// Id of the first row matching `filter`.
    pub async fn id_of(&self, table: &str, filter: &str) -> Result<Option<i64>, DatabaseError> {
        let query = format!("select=id&{}&limit=1", filter);
        let row: Option<Value> = self.select_one(table, &query).await?;
        Ok(row.and_then(|r| r.get("id").and_then(Value::as_i64)))
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert<T>(&self, table: &str, row: Value) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.insert_many(table, Value::Array(vec![row])).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DatabaseError::EmptyResult(format!("insert into {}", table)))
    }

    pub async fn insert_many<T>(&self, table: &str, rows: Value) -> Result<Vec<T>, DatabaseError>
    where T: DeserializeOwned {
        let path = table_path(table, "");
        self.request_with_headers(Method::POST, &path, Some(rows), Some(Self::representation_headers())).await
    }

    /// Inserts one row and returns it shaped by `select`, embeds included.
    pub async fn insert_selecting<T>(&self, table: &str, select: &str, row: Value) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let path = table_path(table, &format!("select={}", select));
        let rows: Vec<T> = self
            .request_with_headers(Method::POST, &path, Some(Value::Array(vec![row])), Some(Self::representation_headers()))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DatabaseError::EmptyResult(format!("insert into {}", table)))
    }

    /// Patches every row matching `filter`; returns the updated rows.
    pub async fn update<T>(&self, table: &str, filter: &str, patch: Value) -> Result<Vec<T>, DatabaseError>
    where T: DeserializeOwned {
        let path = table_path(table, filter);
        self.request_with_headers(Method::PATCH, &path, Some(patch), Some(Self::representation_headers())).await
    }

    /// Deletes every row matching `filter`; returns how many rows went away.
    pub async fn delete(&self, table: &str, filter: &str) -> Result<usize, DatabaseError> {
        let path = table_path(table, filter);
        let removed: Vec<Value> = self
            .request_with_headers(Method::DELETE, &path, None, Some(Self::representation_headers()))
            .await?;
        Ok(removed.len())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn table_path(table: &str, query: &str) -> String {
    if query.is_empty() {
        format!("{}/{}", REST_PREFIX, table)
    } else {
        format!("{}/{}?{}", REST_PREFIX, table, query)
    }
}

/// Percent-encodes a filter value for use inside a PostgREST query string.
pub fn encode_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_paths() {
        assert_eq!(table_path("patients", ""), "/rest/v1/patients");
        assert_eq!(table_path("patients", "id=eq.4"), "/rest/v1/patients?id=eq.4");
    }

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(encode_value("10:00:00+00:00"), "10%3A00%3A00%2B00%3A00");
        assert_eq!(encode_value("a b,c"), "a%20b%2Cc");
    }
}
