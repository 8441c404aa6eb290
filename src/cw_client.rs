//! HTTP client for the ConnectWise Manage REST API.
//!
//! This module provides the `CwClient` struct for making authenticated
//! requests against the ticketing, contact and board endpoints.
//!
//! # Error Policy
//!
//! Every operation issues its request once. A transport failure or a
//! non-success status is logged together with the (sanitized) response body
//! and returned to the caller unchanged. There is no retry or backoff.
//!
//! # Security
//!
//! The auth token and private key are never logged. Response bodies and
//! transport errors are sanitized before they are logged or returned.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::CwError;
use crate::models::{
    first_company_id, join_conditions, Board, BoardStatus, Condition, CreateNoteRequest, Page,
    PatchOperation, StatusTarget, Ticket,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the developer portal client ID.
const CLIENT_ID_HEADER: &str = "clientid";

/// Maximum length for HTTP error response bodies kept in errors and logs.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Page size for a single company's backup ticket history.
const BACKUP_TICKETS_PAGE_SIZE: u32 = 50;

/// Page size for the cross-company open backup ticket sweep.
const OPEN_TICKETS_PAGE_SIZE: u32 = 1000;

/// Statuses that count as open on the backup board.
const OPEN_STATUSES: [&str; 2] = ["New", "In Progress"];

/// Web UI path for the ticket view, relative to the release segment.
const TICKET_WEB_PATH: &str = "services/system_io/Service/fv_sr100_request.rspx";

/// HTTP client for ConnectWise Manage.
///
/// Holds the header set computed once at construction and reuses it for
/// every call. Construction performs no I/O; call
/// [`check_connection`](Self::check_connection) or use
/// [`connect`](Self::connect) to verify the credentials up front.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = CwClient::connect(&config).await?;
///
/// if let Some(company_id) = client.lookup_company_id_by_email("it@acme.com").await? {
///     let tickets = client.list_backup_tickets(&company_id).await?;
/// }
/// ```
#[derive(Clone)]
pub struct CwClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL of the REST API, without trailing slash.
    base_url: String,

    /// Headers sent with every request.
    headers: HeaderMap,

    /// Company identifier, used for web links.
    company: String,

    /// Basic auth token.
    /// SECURITY: Never log this value!
    token: String,

    /// Private key, kept only to scrub it from error messages.
    private_key: String,

    /// Contact email filter for the connection test.
    check_email: Option<String>,

    /// Board backup tickets are filed on.
    backup_board: String,

    /// Status `close_ticket` moves tickets to.
    closed_status: StatusTarget,
}

impl CwClient {
    /// Creates a new client from configuration.
    ///
    /// Uses the configured header override when present, otherwise builds
    /// the default `Authorization`, client ID and content type headers.
    ///
    /// # Errors
    ///
    /// Returns `CwError::HttpClient` if the HTTP client fails to initialize,
    /// or `CwError::InvalidHeader` if a credential cannot be sent as a header.
    pub fn new(config: &Config) -> Result<Self, CwError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(CwError::HttpClient)?;

        let token = config.credentials.token();

        let headers = match &config.headers {
            Some(headers) => headers.clone(),
            None => Self::default_headers(&token, config.credentials.client_id())?,
        };

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
            company: config.credentials.company().to_string(),
            token,
            private_key: config.credentials.private_key().to_string(),
            check_email: config.check_email.clone(),
            backup_board: config.backup_board.clone(),
            closed_status: config.closed_status.clone(),
        })
    }

    /// Creates a new client and verifies it with a connection test.
    ///
    /// # Errors
    ///
    /// Returns any construction error, or `CwError::ConnectionTest` if the
    /// validation request fails. No client is returned in that case.
    pub async fn connect(config: &Config) -> Result<Self, CwError> {
        let client = Self::new(config)?;
        client.check_connection().await?;
        Ok(client)
    }

    /// Builds the default header set.
    fn default_headers(token: &str, client_id: &str) -> Result<HeaderMap, CwError> {
        let mut auth = HeaderValue::from_str(&format!("Basic {}", token)).map_err(|e| {
            CwError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let client_id = HeaderValue::from_str(client_id).map_err(|e| CwError::InvalidHeader {
            name: CLIENT_ID_HEADER.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), client_id);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Returns the secrets to scrub from anything logged or returned.
    pub(crate) fn secrets_for_sanitization(&self) -> [&str; 2] {
        [&self.token, &self.private_key]
    }

    /// Sanitizes a message against this client's secrets.
    fn sanitize(&self, message: &str) -> String {
        CwError::sanitize_message(message, &self.secrets_for_sanitization())
    }

    /// Parses a numeric ID string, as used by every ConnectWise record.
    ///
    /// This prevents condition injection via malformed IDs interpolated
    /// into filter strings.
    ///
    /// # Errors
    ///
    /// Returns `CwError::Validation` if the ID is empty or contains non-digit characters.
    fn parse_id(id: &str, field_name: &str) -> Result<u64, CwError> {
        let invalid = || {
            CwError::validation(format!(
                "{} must be a numeric string, got: {:?}",
                field_name,
                id.chars().take(50).collect::<String>()
            ))
        };

        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        id.parse::<u64>().map_err(|_| invalid())
    }

    /// Checks a value that will be interpolated into a quoted condition.
    fn validate_condition_text(value: &str, field_name: &str) -> Result<(), CwError> {
        if value.is_empty() {
            return Err(CwError::validation(format!("{} must not be empty", field_name)));
        }
        if value.contains('\'') {
            return Err(CwError::validation(format!(
                "{} must not contain single quotes",
                field_name
            )));
        }
        Ok(())
    }

    /// Returns the web URL for viewing a ticket in the ConnectWise UI.
    ///
    /// The web host is the API host without its `api-` prefix.
    pub fn ticket_web_url(&self, ticket_id: u64) -> String {
        let (origin, release) = match Url::parse(&self.base_url) {
            Ok(mut url) => {
                let release = url
                    .path_segments()
                    .and_then(|mut segments| segments.next())
                    .filter(|s| !s.is_empty())
                    .unwrap_or("v4_6_release")
                    .to_string();
                let web_host = url
                    .host_str()
                    .and_then(|h| h.strip_prefix("api-"))
                    .map(str::to_string);
                if let Some(host) = web_host {
                    url.set_host(Some(&host)).ok();
                }
                (url.origin().ascii_serialization(), release)
            }
            Err(_) => (self.base_url.clone(), "v4_6_release".to_string()),
        };

        format!(
            "{}/{}/{}?service_recid={}&companyName={}",
            origin,
            release,
            TICKET_WEB_PATH,
            ticket_id,
            urlencoding::encode(&self.company)
        )
    }

    /// Tests connectivity and credentials.
    ///
    /// Issues a single one-row contact search, filtered to the configured
    /// check email when there is one.
    ///
    /// # Errors
    ///
    /// Returns `CwError::ConnectionTest` if the request fails, with details
    /// about the failure reason.
    pub async fn check_connection(&self) -> Result<(), CwError> {
        tracing::debug!("Testing connection to ConnectWise");

        let mut params = ListParams::new().with_page_size(1);
        if let Some(email) = &self.check_email {
            Self::validate_condition_text(email, "check email")?;
            params = params.with_child_condition(Condition::equals_str(
                "communicationItems/value",
                email.as_str(),
            ));
        }

        let result: Result<serde_json::Value, CwError> =
            self.get_json("company/contacts", &params.to_query()).await;

        match result {
            Ok(_) => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Err(e) if e.is_auth_failure() => Err(CwError::connection_test(
                "Authentication failed - verify CW_COMPANY, CW_PUBLIC_KEY, CW_PRIVATE_KEY and CW_CLIENT_ID",
            )),
            Err(CwError::Timeout { duration, .. }) => Err(CwError::connection_test(format!(
                "Connection timed out after {:?} - verify CW_BASE_URL is correct and the server is reachable",
                duration
            ))),
            Err(CwError::Http(e)) => Err(CwError::connection_test(format!(
                "HTTP error: {} - verify CW_BASE_URL is correct",
                self.sanitize(&e.to_string())
            ))),
            Err(e) => Err(CwError::connection_test(self.sanitize(&e.to_string()))),
        }
    }

    /// Sends a request and returns the response if its status is a success.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - Endpoint path relative to the base URL (e.g. "service/tickets")
    /// * `query` - Query string pairs
    /// * `body` - Optional JSON body
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, CwError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        tracing::debug!(
            method = %method,
            path = %path,
            "Making ConnectWise API request"
        );

        let mut req = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers.clone());

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(
                method = %method,
                path = %path,
                error = %self.sanitize(&e.to_string()),
                "ConnectWise API request failed"
            );
            if e.is_timeout() {
                return CwError::Timeout {
                    duration: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                    operation: format!("{} {}", method, path),
                };
            }
            CwError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_http_error(&method, path, status, response).await);
        }

        Ok(response)
    }

    /// Makes a GET request and parses the JSON response body.
    async fn get_json<T>(&self, path: &str, query: &[(&'static str, String)]) -> Result<T, CwError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, path, query, None).await?;
        let body = response.text().await.map_err(CwError::Http)?;

        tracing::trace!(body = %body, "ConnectWise API response");

        serde_json::from_str(&body).map_err(CwError::Serialization)
    }

    /// Makes a request with a JSON body, discarding the response body.
    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), CwError> {
        self.send(method, path, &[], Some(body)).await?;
        Ok(())
    }

    /// Converts a non-success response into `CwError::HttpStatus`.
    ///
    /// The body is logged as a diagnostic after sanitization and truncation.
    async fn handle_http_error(
        &self,
        method: &Method,
        path: &str,
        status: StatusCode,
        response: reqwest::Response,
    ) -> CwError {
        let body = response.text().await.unwrap_or_default();
        let body = truncate_body(&self.sanitize(&body));

        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            body = %body,
            "ConnectWise API returned an error"
        );

        CwError::HttpStatus { status, body }
    }

    /// Looks up the internal company ID of the contact with this email.
    ///
    /// # Returns
    ///
    /// The company ID as a string, or `None` if no contact matches or the
    /// result has no company reference.
    ///
    /// # Errors
    ///
    /// Returns `CwError::Validation` for an empty email or one containing a
    /// single quote; otherwise propagates HTTP and transport errors.
    pub async fn lookup_company_id_by_email(&self, email: &str) -> Result<Option<String>, CwError> {
        let email = email.trim();
        Self::validate_condition_text(email, "email")?;

        let params = ListParams::new()
            .with_page_size(1)
            .with_child_condition(Condition::equals_str("communicationItems/value", email));

        let result: serde_json::Value = self.get_json("company/contacts", &params.to_query()).await?;

        let company_id = first_company_id(&result);
        if company_id.is_none() {
            tracing::debug!("No company found for contact email");
        }
        Ok(company_id)
    }

    /// Lists the 50 most recent backup tickets of one company.
    ///
    /// # Arguments
    ///
    /// * `company_id` - The internal numeric company ID (not the company identifier)
    ///
    /// # Errors
    ///
    /// Returns `CwError::Validation` if the company ID is not numeric.
    pub async fn list_backup_tickets(&self, company_id: &str) -> Result<Vec<Ticket>, CwError> {
        let company_id = Self::parse_id(company_id, "company_id")?;

        let params = ListParams::new()
            .with_page_size(BACKUP_TICKETS_PAGE_SIZE)
            .with_page(Page::Last)
            .with_order_by("dateEntered desc")
            .with_condition(Condition::equals_num("company/id", company_id))
            .with_condition(Condition::equals_str(
                "board/name",
                self.backup_board.as_str(),
            ));

        let tickets: Vec<Ticket> = self.get_json("service/tickets", &params.to_query()).await?;

        tracing::debug!(company_id, count = tickets.len(), "Fetched backup tickets");
        Ok(tickets)
    }

    /// Lists up to 1000 backup tickets in status `New` or `In Progress`, across all companies.
    pub async fn list_open_backup_tickets(&self) -> Result<Vec<Ticket>, CwError> {
        let params = ListParams::new()
            .with_page_size(OPEN_TICKETS_PAGE_SIZE)
            .with_page(Page::Last)
            .with_order_by("dateEntered desc")
            .with_condition(Condition::equals_str(
                "board/name",
                self.backup_board.as_str(),
            ))
            .with_condition(Condition::any_of(
                OPEN_STATUSES
                    .iter()
                    .map(|status| Condition::equals_str("status/name", *status)),
            ));

        let tickets: Vec<Ticket> = self.get_json("service/tickets", &params.to_query()).await?;

        tracing::debug!(count = tickets.len(), "Fetched open backup tickets");
        Ok(tickets)
    }

    /// Gets a single ticket by number.
    ///
    /// # Errors
    ///
    /// Returns `CwError::NotFound` if no ticket has this number.
    pub async fn get_ticket(&self, ticket_id: u64) -> Result<Ticket, CwError> {
        let params = ListParams::new()
            .with_page_size(1)
            .with_condition(Condition::equals_num("id", ticket_id));

        let tickets: Vec<Ticket> = self.get_json("service/tickets", &params.to_query()).await?;

        tickets
            .into_iter()
            .next()
            .ok_or_else(|| CwError::not_found(format!("ticket {}", ticket_id)))
    }

    /// Moves a ticket to the status with this ID.
    pub async fn set_ticket_status(&self, ticket_id: u64, status_id: u64) -> Result<(), CwError> {
        let body = serde_json::to_value(vec![PatchOperation::replace("status/id", status_id)])?;
        let path = format!("service/tickets/{}", ticket_id);

        self.send_json(Method::PATCH, &path, body).await?;

        tracing::info!(ticket_id, status_id, "Ticket status updated");
        Ok(())
    }

    /// Closes a ticket by moving it to the configured closed status.
    ///
    /// A status configured by name is resolved on the board the ticket
    /// lives on, which costs two extra lookups.
    ///
    /// # Errors
    ///
    /// Returns `CwError::NotFound` if a named status cannot be resolved.
    pub async fn close_ticket(&self, ticket_id: u64) -> Result<(), CwError> {
        let status_id = match &self.closed_status {
            StatusTarget::Id(id) => *id,
            StatusTarget::Name(name) => {
                let ticket = self.get_ticket(ticket_id).await?;
                let board_id = ticket.board_id().ok_or_else(|| {
                    CwError::not_found(format!("board of ticket {}", ticket_id))
                })?;
                self.resolve_status_id(board_id, name).await?
            }
        };

        self.set_ticket_status(ticket_id, status_id).await
    }

    /// Finds the ID of the board with this name.
    ///
    /// # Errors
    ///
    /// Returns `CwError::NotFound` if no board has this name.
    pub async fn find_board_id(&self, board_name: &str) -> Result<u64, CwError> {
        Self::validate_condition_text(board_name, "board name")?;

        let params = ListParams::new()
            .with_page_size(1)
            .with_condition(Condition::equals_str("name", board_name));

        let boards: Vec<Board> = self.get_json("service/boards", &params.to_query()).await?;

        boards
            .into_iter()
            .next()
            .map(|b| b.id)
            .ok_or_else(|| CwError::not_found(format!("board '{}'", board_name)))
    }

    /// Resolves a status name to its ID on a board.
    ///
    /// # Errors
    ///
    /// Returns `CwError::NotFound` if the board has no status with this name.
    pub async fn resolve_status_id(&self, board_id: u64, status_name: &str) -> Result<u64, CwError> {
        Self::validate_condition_text(status_name, "status name")?;

        let params = ListParams::new()
            .with_page_size(1)
            .with_condition(Condition::equals_str("name", status_name));
        let path = format!("service/boards/{}/statuses", board_id);

        let statuses: Vec<BoardStatus> = self.get_json(&path, &params.to_query()).await?;

        let status = statuses.into_iter().next().ok_or_else(|| {
            CwError::not_found(format!("status '{}' on board {}", status_name, board_id))
        })?;

        tracing::debug!(board_id, status_id = status.id, "Resolved status name");
        Ok(status.id)
    }

    /// Adds an internal-only note to a ticket.
    pub async fn add_internal_note(&self, ticket_id: u64, message: &str) -> Result<(), CwError> {
        let body = serde_json::to_value(CreateNoteRequest::internal(message))?;
        let path = format!("service/tickets/{}/notes", ticket_id);

        self.send_json(Method::POST, &path, body).await?;

        tracing::info!(ticket_id, "Internal note added");
        Ok(())
    }
}

/// Truncates an error body to `MAX_ERROR_BODY_LEN` bytes on a char boundary.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}

/// Query parameters for list endpoints.
///
/// Use the builder methods to construct pagination and filter criteria.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    page_size: Option<u32>,
    page: Option<Page>,
    order_by: Option<String>,
    conditions: Vec<Condition>,
    child_conditions: Vec<Condition>,
}

impl ListParams {
    /// Creates empty list parameters (server-side default pagination).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of results to return.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Selects the page to return.
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the sort expression (e.g. "dateEntered desc").
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Adds a condition on the record's own fields.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a condition on a child collection (e.g. a contact's communication items).
    pub fn with_child_condition(mut self, condition: Condition) -> Self {
        self.child_conditions.push(condition);
        self
    }

    /// Converts parameters to query string pairs.
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(size) = self.page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(order_by) = &self.order_by {
            query.push(("orderBy", order_by.clone()));
        }
        if !self.conditions.is_empty() {
            query.push(("conditions", join_conditions(&self.conditions)));
        }
        if !self.child_conditions.is_empty() {
            query.push(("childconditions", join_conditions(&self.child_conditions)));
        }

        query
    }
}
