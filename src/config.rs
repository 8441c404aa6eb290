//! Configuration management for cwdesk.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present, and offers
//! builder methods for constructing a [`Config`] in code.

use std::env;
use std::fmt;

use base64::Engine;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::CwError;
use crate::models::StatusTarget;

/// Default ConnectWise Manage API endpoint (North America cloud).
pub const DEFAULT_BASE_URL: &str = "https://api-na.myconnectwise.net/v4_6_release/apis/3.0/";

/// Board that backup job tickets are filed on.
pub const DEFAULT_BACKUP_BOARD: &str = "Backup Tickets";

/// Closed status ID on the default backup board.
pub const DEFAULT_CLOSED_STATUS_ID: u64 = 696;

/// API credentials for a ConnectWise Manage integration.
///
/// The keys are never logged; the `Debug` output redacts them.
#[derive(Clone)]
pub struct Credentials {
    company: String,
    public_key: String,
    private_key: String,
    client_id: String,
}

impl Credentials {
    /// Creates credentials from the company identifier, API key pair and client ID.
    pub fn new(
        company: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
            client_id: client_id.into(),
        }
    }

    /// The company identifier used at login (e.g. `mycompany`).
    pub fn company(&self) -> &str {
        &self.company
    }

    /// The client ID issued by the ConnectWise developer portal.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The private key, exposed only for sanitizing error messages.
    pub(crate) fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Returns the base64 Basic auth token for `company+public:private`.
    pub fn token(&self) -> String {
        let raw = format!("{}+{}:{}", self.company, self.public_key, self.private_key);
        base64::engine::general_purpose::STANDARD.encode(raw)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company", &self.company)
            .field("public_key", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Configuration for connecting to ConnectWise Manage.
#[derive(Clone)]
pub struct Config {
    /// API credentials.
    pub credentials: Credentials,

    /// Base URL of the REST API, without trailing slash.
    pub base_url: String,

    /// Replaces the default header set wholesale when present.
    pub headers: Option<HeaderMap>,

    /// Contact email used to filter the connection test lookup.
    pub check_email: Option<String>,

    /// Name of the board backup tickets are filed on.
    pub backup_board: String,

    /// Status that `close_ticket` moves a ticket to.
    pub closed_status: StatusTarget,
}

impl Config {
    /// Creates a configuration with the default endpoint and backup board settings.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.trim_end_matches('/').to_string(),
            headers: None,
            check_email: None,
            backup_board: DEFAULT_BACKUP_BOARD.to_string(),
            closed_status: StatusTarget::Id(DEFAULT_CLOSED_STATUS_ID),
        }
    }

    /// Overrides the API endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CwError::Config` if the URL is not an absolute http(s) URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self, CwError> {
        self.base_url = Self::validate_base_url(url.into())?;
        Ok(self)
    }

    /// Replaces the entire default header set sent with every request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Filters the connection test to the contact with this email.
    pub fn with_check_email(mut self, email: impl Into<String>) -> Self {
        self.check_email = Some(email.into());
        self
    }

    /// Sets the board backup tickets are filed on.
    pub fn with_backup_board(mut self, board: impl Into<String>) -> Self {
        self.backup_board = board.into();
        self
    }

    /// Sets the status `close_ticket` moves a ticket to.
    pub fn with_closed_status(mut self, status: StatusTarget) -> Self {
        self.closed_status = status;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `CW_COMPANY`: Company identifier used at login
    /// - `CW_PUBLIC_KEY`: API member public key
    /// - `CW_PRIVATE_KEY`: API member private key
    /// - `CW_CLIENT_ID`: Client ID from the developer portal
    ///
    /// # Optional Environment Variables
    ///
    /// - `CW_BASE_URL`: API endpoint (default: North America cloud)
    /// - `CW_CHECK_EMAIL`: Contact email for the connection test
    /// - `CW_BACKUP_BOARD`: Backup board name (default: `Backup Tickets`)
    /// - `CW_CLOSED_STATUS`: Closed status ID or name (default: `696`)
    ///
    /// # Errors
    ///
    /// Returns `CwError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, CwError> {
        let company = Self::get_required_env("CW_COMPANY")?;
        let public_key = Self::get_required_env("CW_PUBLIC_KEY")?;
        let private_key = Self::get_required_env("CW_PRIVATE_KEY")?;
        let client_id = Self::get_required_env("CW_CLIENT_ID")?;

        Self::validate_key("CW_PUBLIC_KEY", &public_key)?;
        Self::validate_key("CW_PRIVATE_KEY", &private_key)?;

        let mut config = Config::new(Credentials::new(
            company.trim(),
            public_key.trim(),
            private_key.trim(),
            client_id.trim(),
        ));

        if let Some(url) = Self::get_optional_env("CW_BASE_URL") {
            config = config.with_base_url(url)?;
        }
        if let Some(email) = Self::get_optional_env("CW_CHECK_EMAIL") {
            config = config.with_check_email(email);
        }
        if let Some(board) = Self::get_optional_env("CW_BACKUP_BOARD") {
            config = config.with_backup_board(board);
        }
        if let Some(status) = Self::get_optional_env("CW_CLOSED_STATUS") {
            config = config.with_closed_status(StatusTarget::parse(&status));
        }

        Ok(config)
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, CwError> {
        env::var(name)
            .map_err(|_| CwError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(CwError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    /// Gets an optional environment variable, treating blank values as unset.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, CwError> {
        let url = url.trim().trim_end_matches('/').to_string();

        let parsed = Url::parse(&url)
            .map_err(|e| CwError::invalid_config(format!("CW_BASE_URL is not a valid URL: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CwError::invalid_config(
                "CW_BASE_URL must start with http:// or https://",
            ));
        }

        Ok(url)
    }

    /// Rejects key values that look like template placeholders.
    fn validate_key(name: &str, key: &str) -> Result<(), CwError> {
        let key_lower = key.to_lowercase();
        let placeholder_patterns = ["your_", "placeholder", "xxx", "changeme"];

        for pattern in placeholder_patterns {
            if key_lower.contains(pattern) {
                return Err(CwError::invalid_config(format!(
                    "{} appears to be a placeholder value",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.as_ref().map(|h| h.len()))
            .field("check_email", &self.check_email)
            .field("backup_board", &self.backup_board)
            .field("closed_status", &self.closed_status)
            .finish()
    }
}
