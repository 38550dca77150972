use std::{collections::BTreeMap, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::{
    config::{Config, DEFAULT_API_URL},
    error::{ApiError, ApiResult},
    lastfm::signature::sign,
};

/// Request parameters, kept sorted so cache keys and signatures are stable.
pub type Params = BTreeMap<String, String>;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("utafm/", env!("CARGO_PKG_VERSION"));

/// Provider error codes with a dedicated [`ApiError`] variant.
const ERROR_NOT_FOUND: i64 = 6;
const ERROR_OPERATION_FAILED: i64 = 8;
const ERROR_RATE_LIMITED: i64 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Builds a [`Params`] map from borrowed pairs.
pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Stateless Last.fm transport.
///
/// Adds the API key and `format=json`, drops empty parameters, signs when
/// asked to and turns every failure into a classified [`ApiError`]. Holding
/// no per-request state lets the retry wrapper call it again freely.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    http: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl LastFmClient {
    pub fn new(api_key: &str, api_secret: &str) -> ApiResult<Self> {
        Self::with_base_url(api_key, api_secret, DEFAULT_API_URL, REQUEST_TIMEOUT)
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::with_base_url(
            &config.api_key,
            &config.api_secret,
            &config.api_url,
            REQUEST_TIMEOUT,
        )
    }

    pub fn with_base_url(
        api_key: &str,
        api_secret: &str,
        base_url: &str,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            base_url: base_url.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Unsigned GET, used for every read-only call.
    pub async fn request(&self, params: &Params) -> ApiResult<Value> {
        let query = self.prepare(params, false)?;
        self.send(self.http.get(&self.base_url).query(&query)).await
    }

    /// Sends a signed call, used for auth and write operations.
    ///
    /// Empty parameters are dropped, `api_key` is added, and `api_sig` is
    /// computed over the remaining set before `format=json` is appended.
    ///
    /// # Arguments
    ///
    /// * `params` - Call parameters including `method`
    /// * `method` - `Get` puts the fields in the query string, `Post` sends
    ///   them form-encoded
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Value)` - The decoded JSON body of a successful call
    /// - `Err(ApiError)` - See [`classify`]; a missing `method` is a
    ///   `ClientError` raised before anything is sent
    ///
    /// # Example
    ///
    /// ```
    /// let body = client
    ///     .request_signed(&params([("method", "auth.getToken")]), HttpMethod::Get)
    ///     .await?;
    /// ```
    pub async fn request_signed(&self, params: &Params, method: HttpMethod) -> ApiResult<Value> {
        let fields = self.prepare(params, true)?;
        let builder = match method {
            HttpMethod::Get => self.http.get(&self.base_url).query(&fields),
            HttpMethod::Post => self.http.post(&self.base_url).form(&fields),
        };
        self.send(builder).await
    }

    fn prepare(&self, params: &Params, signed: bool) -> ApiResult<Vec<(String, String)>> {
        let method = params.get("method").filter(|m| !m.is_empty()).ok_or_else(|| {
            ApiError::ClientError {
                status: StatusCode::BAD_REQUEST.as_u16(),
                message: "Last.fm API method is required".to_string(),
            }
        })?;
        tracing::debug!(target: "lastfm", method = %method, signed, "Last.fm API call");

        let mut fields: Params = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.insert("api_key".to_string(), self.api_key.clone());

        if signed {
            let signature = sign(
                fields.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                &self.api_secret,
            );
            fields.insert("api_sig".to_string(), signature);
        }
        fields.insert("format".to_string(), "json".to_string());

        Ok(fields.into_iter().collect())
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Value> {
        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_reqwest)?;
        classify(status, &body)
    }
}

/// Maps an HTTP status and body to a payload or a typed error.
///
/// # Classification
///
/// - `429`, or provider error 29 → `RateLimited`
/// - any `5xx` → `ServerError`
/// - other non-success statuses → `NotFound` for provider error 6, otherwise
///   `ClientError` with the provider message when there is one
/// - a `2xx` body carrying `error` → `NotFound` (6), `OperationFailed` (8)
///   or `Provider`
/// - a `2xx` body that is not JSON → `MalformedResponse`
pub fn classify(status: StatusCode, body: &str) -> ApiResult<Value> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited);
    }
    if status.is_server_error() {
        return Err(ApiError::ServerError {
            status: status.as_u16(),
        });
    }

    let parsed = serde_json::from_str::<Value>(body).ok();

    if !status.is_success() {
        if let Some(err) = parsed.as_ref().and_then(provider_error) {
            if matches!(err, ApiError::NotFound(_) | ApiError::RateLimited) {
                return Err(err);
            }
        }
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
        return Err(ApiError::ClientError {
            status: status.as_u16(),
            message,
        });
    }

    let value = parsed
        .ok_or_else(|| ApiError::MalformedResponse("response is not JSON".to_string()))?;
    if !value.is_object() {
        return Err(ApiError::MalformedResponse(
            "response is not a JSON object".to_string(),
        ));
    }
    if let Some(err) = provider_error(&value) {
        return Err(err);
    }

    Ok(value)
}

fn provider_error(value: &Value) -> Option<ApiError> {
    let error = value.get("error")?;
    let code = error
        .as_i64()
        .or_else(|| error.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or_default();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(match code {
        ERROR_NOT_FOUND => ApiError::NotFound(message),
        ERROR_OPERATION_FAILED => ApiError::OperationFailed(message),
        ERROR_RATE_LIMITED => ApiError::RateLimited,
        _ => ApiError::Provider { code, message },
    })
}
