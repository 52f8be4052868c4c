//! HTTP implementation of the chat service client
//!
//! Every chat call carries the bearer token from the shared
//! [`AuthContext`]. A 401 or 403 from any chat endpoint tears the context
//! down before the error is returned, so the rest of the program sees a
//! signed-out client.

use crate::api::types::{
    Acknowledgement, AuthResponse, ChatHistoryResponse, ChatListing, ChatSummary,
    ContinueChatResponse, DatabaseInfo, DatabaseListResponse, DatabaseSchema, ForgotPasswordRequest,
    HistoryMessage, LoginRequest, MessageData, MessageRequest, NewChatResponse, RawTable,
    RegisterRequest, ResetPasswordRequest, SchemaResponse, TableSchema,
};
use crate::api::ChatApi;
use crate::auth::{AuthContext, Credentials};
use crate::config::ApiConfig;
use crate::error::{QuerychatError, Result};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Longest error body echoed back to the user
const MAX_ERROR_BODY: usize = 200;

/// File formats offered by `GET /chat/download/{message_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    /// Value of the `format` query parameter
    pub fn as_param(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// File extension for a saved export
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            other => other.as_param(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!(
                "unknown export format '{}' (expected json, csv, excel or pdf)",
                other
            )),
        }
    }
}

/// What `register` left behind
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The service signed the new account in; the token is stored
    SignedIn(Credentials),
    /// The account exists but must be confirmed (e.g. by email) first
    ConfirmationRequired,
    /// The account exists; sign in separately
    Created,
}

/// Client for the chat and auth endpoints
///
/// Cloning is cheap: the underlying connection pool and auth context are
/// shared.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use querychat::api::{ApiClient, ChatApi};
/// use querychat::auth::{AuthContext, FileStore};
/// use querychat::config::ApiConfig;
///
/// # async fn example() -> querychat::error::Result<()> {
/// let auth = Arc::new(AuthContext::init(Box::new(FileStore::new("/tmp/creds.json"))));
/// let client = ApiClient::new(&ApiConfig::default(), auth)?;
/// let chats = client.list_chats().await?;
/// println!("{} chats", chats.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    database_type: Option<String>,
    auth: Arc<AuthContext>,
}

impl ApiClient {
    /// Create a client for the configured service
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is unusable or HTTP client
    /// initialization fails
    pub fn new(config: &ApiConfig, auth: Arc<AuthContext>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("querychat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuerychatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            QuerychatError::Config(format!("Invalid api.base_url {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(QuerychatError::Config(format!(
                "api.base_url {} cannot carry a path",
                config.base_url
            ))
            .into());
        }
        tracing::info!("Initialized chat service client: base_url={}", base_url);

        Ok(Self {
            client,
            base_url,
            database_type: config.database_type.clone(),
            auth,
        })
    }

    /// The shared auth context
    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    /// Database sent with every question, if any
    pub fn database_type(&self) -> Option<&str> {
        self.database_type.as_deref()
    }

    /// Base URL plus `segments`, each percent-encoded as a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth.authorization_header() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    fn message_request(&self, message: &str) -> MessageRequest {
        MessageRequest {
            message: message.to_string(),
            database_type: self.database_type.clone(),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            };
            tracing::warn!("Chat service request failed: {}", message);
            QuerychatError::Network(message).into()
        })
    }

    /// Send an authorized chat request and apply the global-logout rule.
    async fn execute_chat(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.send(self.authorized(builder)).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!("Chat service rejected the session token ({})", status);
            if let Err(e) = self.auth.teardown() {
                tracing::warn!("Failed to clear stored credentials: {}", e);
            }
            return Err(QuerychatError::Authentication(format!(
                "session rejected by the service ({}); sign in again",
                status.as_u16()
            ))
            .into());
        }

        ensure_success(response).await
    }

    async fn execute_auth(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.send(builder).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(QuerychatError::Authentication(
                "invalid username or password".to_string(),
            )
            .into());
        }
        ensure_success(response).await
    }

    /// Sign in and store the returned token
    ///
    /// # Errors
    ///
    /// Returns [`QuerychatError::Authentication`] on rejected credentials or
    /// when the service answers without a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        tracing::debug!(username = %username, "Logging in");
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .execute_auth(self.client.post(self.endpoint(&["auth", "login"])).json(&request))
            .await?;
        let body: AuthResponse = decode(response).await?;

        let credentials = credentials_from(body).ok_or_else(|| {
            QuerychatError::Authentication("service returned no access token".to_string())
        })?;
        self.auth.establish(credentials.clone())?;
        Ok(credentials)
    }

    /// Create an account.
    ///
    /// A token in the answer signs the new account in immediately, unless
    /// the service also asks for confirmation.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Registration> {
        tracing::debug!(username = %request.username, "Registering account");
        let response = self
            .execute_auth(self.client.post(self.endpoint(&["auth", "register"])).json(request))
            .await?;
        let body: AuthResponse = decode(response).await?;

        if body.confirmation_required {
            tracing::info!("Registration needs confirmation");
            return Ok(Registration::ConfirmationRequired);
        }
        match credentials_from(body) {
            Some(credentials) => {
                self.auth.establish(credentials.clone())?;
                Ok(Registration::SignedIn(credentials))
            }
            None => Ok(Registration::Created),
        }
    }

    /// Sign out on the service, then forget the token locally.
    ///
    /// The local token is cleared even when the service call fails.
    pub async fn logout(&self) -> Result<()> {
        if self.auth.is_authenticated() {
            let request = self.authorized(self.client.post(self.endpoint(&["auth", "logout"])));
            match self.send(request).await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Service session closed");
                }
                Ok(response) => {
                    tracing::warn!("Service logout returned {}", response.status());
                }
                Err(e) => tracing::warn!("Service logout failed: {}", e),
            }
        }
        self.auth.teardown()
    }

    /// Ask the service to email a password reset link
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>> {
        let request = ForgotPasswordRequest {
            email: email.to_string(),
        };
        let response = self
            .execute_auth(
                self.client
                    .post(self.endpoint(&["auth", "forgot-password"]))
                    .json(&request),
            )
            .await?;
        Ok(decode_ack(response).await)
    }

    /// Set a new password using the token from the reset email
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Option<String>> {
        let request = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        let response = self
            .execute_auth(
                self.client
                    .post(self.endpoint(&["auth", "reset-password"]))
                    .json(&request),
            )
            .await?;
        Ok(decode_ack(response).await)
    }

    /// Download the rows of one reply as a file
    pub async fn download_message_data(
        &self,
        message_id: &str,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        let mut url = self.endpoint(&["chat", "download", message_id]);
        url.query_pairs_mut().append_pair("format", format.as_param());

        let response = self.execute_chat(self.client.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| QuerychatError::Network(e.to_string()))?;
        tracing::debug!(message_id = %message_id, %format, size = bytes.len(), "Downloaded export");
        Ok(bytes.to_vec())
    }

    /// Databases the service can answer questions about
    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let response = self
            .execute_chat(self.client.get(self.endpoint(&["db-info", "databases"])))
            .await?;
        let body: DatabaseListResponse = decode(response).await?;
        check_status(body.status.as_deref())?;

        Ok(body
            .databases
            .into_iter()
            .map(|(name, description)| DatabaseInfo {
                name,
                description: match description {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
            })
            .collect())
    }

    /// Tables and columns of one database
    pub async fn database_schema(&self, database: &str) -> Result<DatabaseSchema> {
        let response = self
            .execute_chat(
                self.client
                    .get(self.endpoint(&["db-info", "schema", database])),
            )
            .await?;
        let body: SchemaResponse = decode(response).await?;
        check_status(body.status.as_deref())?;

        let mut tables = Vec::with_capacity(body.schema.tables.len());
        for (name, value) in body.schema.tables {
            let table: RawTable = serde_json::from_value(value)?;
            tables.push(TableSchema {
                name,
                columns: table.columns,
                sample_data: table.sample_data,
            });
        }

        Ok(DatabaseSchema {
            database: if body.schema.database.is_empty() {
                database.to_string()
            } else {
                body.schema.database
            },
            database_path: body.schema.database_path,
            tables,
        })
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn new_chat(&self, message: &str) -> Result<NewChatResponse> {
        let request = self.message_request(message);
        let response = self
            .execute_chat(self.client.post(self.endpoint(&["chat", "new"])).json(&request))
            .await?;
        decode(response).await
    }

    async fn continue_chat(&self, chat_id: &str, message: &str) -> Result<ContinueChatResponse> {
        let request = self.message_request(message);
        let response = self
            .execute_chat(
                self.client
                    .post(self.endpoint(&["chat", "continue", chat_id]))
                    .json(&request),
            )
            .await?;
        decode(response).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let response = self
            .execute_chat(self.client.get(self.endpoint(&["chat", "history"])))
            .await?;
        let listing: ChatListing = decode(response).await?;
        Ok(listing.into_vec())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<HistoryMessage>> {
        let response = self
            .execute_chat(
                self.client
                    .get(self.endpoint(&["chat", "history", chat_id])),
            )
            .await?;
        let history: ChatHistoryResponse = decode(response).await?;
        Ok(history.messages)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.execute_chat(
            self.client
                .delete(self.endpoint(&["chat", "history", chat_id])),
        )
        .await?;
        Ok(())
    }

    async fn message_data(&self, message_id: &str) -> Result<MessageData> {
        let response = self
            .execute_chat(self.client.get(self.endpoint(&["chat", "data", message_id])))
            .await?;
        decode(response).await
    }
}

fn credentials_from(body: AuthResponse) -> Option<Credentials> {
    let access_token = body.access_token.filter(|t| !t.is_empty())?;
    Some(Credentials {
        access_token,
        token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
        user: body.user,
        saved_at: Utc::now(),
    })
}

/// The schema endpoints wrap their payload in `{status: "success", ...}`.
fn check_status(status: Option<&str>) -> Result<()> {
    match status {
        None | Some("success") => Ok(()),
        Some(other) => {
            Err(QuerychatError::Fetch(format!("service reported status '{}'", other)).into())
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::warn!("Chat service returned {}: {}", status, message);
    Err(QuerychatError::Api {
        status: status.as_u16(),
        message,
    }
    .into())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| QuerychatError::Network(e.to_string()))?;
    Ok(serde_json::from_str(&body)?)
}

async fn decode_ack(response: Response) -> Option<String> {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<Acknowledgement>(&body)
        .ok()
        .and_then(|ack| ack.message)
}

/// Pick the most useful text out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
