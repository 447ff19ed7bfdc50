//! HTTP client for the botstat.io API

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use botstat_api::{BotInfo, Envelope, TaskId, TaskStatus};

use crate::error::{BotStatError, Result};
use crate::upload::UploadFile;

const BASE_URL: &str = "https://api.botstat.io";

/// How long `close` yields to let connection teardown finish.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

/// Asynchronous client for the botstat.io API.
///
/// Owns one lazily created `reqwest::Client`, built on the first request
/// and reused for every call after that. Credentials are optional at
/// construction; endpoints that need one fail with
/// [`BotStatError::Configuration`] before any network traffic when it is
/// missing.
///
/// # Example
/// ```no_run
/// use botstat_client::BotStatClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BotStatClient::new().with_access_key("KEY");
/// let info = client.get_bot_info("examplebot").await?;
/// println!("{} live users", info.users_live);
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BotStatClient {
    session: Mutex<Option<Client>>,
    base_url: Url,
    token: Option<String>,
    access_key: Option<String>,
    timeout: Option<Duration>,
    #[cfg(test)]
    sessions_built: std::sync::atomic::AtomicU32,
}

impl Default for BotStatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStatClient {
    /// Create a client targeting the production API without credentials.
    #[must_use]
    pub fn new() -> Self {
        let base_url = Url::parse(BASE_URL).expect("base URL constant is valid");
        Self {
            session: Mutex::new(None),
            base_url,
            token: None,
            access_key: None,
            timeout: None,
            #[cfg(test)]
            sessions_built: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Set the Telegram bot token used by the task and botman endpoints.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the access key used by the statistics endpoints
    /// (issued at <https://botstat.io/dashboard/api>).
    #[must_use]
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Set a total request timeout. Unset means unbounded; callers that
    /// need a deadline supply their own.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Point the client at a different base URL (used by tests).
    ///
    /// # Errors
    /// Returns an error if the URL does not parse.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Url::parse(base_url.as_ref())?;
        Ok(self)
    }

    /// Release the underlying connection pool if one was opened.
    ///
    /// Idempotent: a client that never issued a request, or was already
    /// closed, returns immediately. The next request after `close`
    /// transparently builds a fresh session.
    pub async fn close(&self) {
        let open = self.lock_session().take();
        if open.is_some() {
            drop(open);
            tokio::time::sleep(CLOSE_GRACE).await;
        }
    }

    /// Build a full URL from a path
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(BotStatError::Url)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Client>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Get the cached session, creating it on first use.
    fn session(&self) -> Result<Client> {
        let mut guard = self.lock_session();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        *guard = Some(client.clone());
        #[cfg(test)]
        self.sessions_built
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(client)
    }

    /// Send a request and decode the `{ok, result}` envelope.
    ///
    /// Anything other than a 200 with `ok: true` becomes an `Api` error
    /// carrying the message extracted from the envelope, or the raw body
    /// when it is not a JSON envelope.
    async fn request(&self, method: Method, url: Url, form: Option<Form>) -> Result<Envelope> {
        let client = self.session()?;
        debug!(%method, path = url.path(), "botstat request");

        let mut request = client.request(method, url);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) if status == StatusCode::OK && envelope.ok => Ok(envelope),
            Ok(envelope) => {
                let message = envelope.error_message().unwrap_or(body);
                warn!(status = status.as_u16(), %message, "botstat API error");
                Err(BotStatError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
            Err(_) => {
                warn!(status = status.as_u16(), "botstat returned a non-JSON body");
                Err(BotStatError::Api {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }

    fn token_or<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        explicit.or(self.token.as_deref()).ok_or_else(|| {
            BotStatError::Configuration(
                "bot token is required; set it with `with_token` or on the request builder"
                    .to_string(),
            )
        })
    }

    fn access_key_or<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        explicit.or(self.access_key.as_deref()).ok_or_else(|| {
            BotStatError::Configuration(
                "access key is required; set it with `with_access_key` \
                 (issued at https://botstat.io/dashboard/api)"
                    .to_string(),
            )
        })
    }

    // Statistics endpoints

    /// Fetch the statistics snapshot for a bot.
    ///
    /// `username` is the bot id or username, case-insensitive. Requires
    /// the instance access key.
    ///
    /// # Errors
    /// `Configuration` when no access key was supplied; `Api` when the
    /// service reports the bot as unknown.
    ///
    /// # Example
    /// ```no_run
    /// # use botstat_client::BotStatClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = BotStatClient::new().with_access_key("KEY");
    /// let info = client.get_bot_info("examplebot").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_bot_info(&self, username: &str) -> Result<BotInfo> {
        let access_key = self.access_key_or(None)?;
        let url = self.url(&format!("/get/{username}/{access_key}"))?;
        let envelope = self.request(Method::GET, url, None).await?;
        Ok(envelope.decode()?)
    }

    /// Report statistics for a bot you own.
    ///
    /// Counts are sent only when set; an explicit zero is sent as `0`
    /// rather than omitted.
    ///
    /// # Example
    /// ```no_run
    /// # use botstat_client::BotStatClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = BotStatClient::new().with_access_key("KEY");
    /// let ok = client.send_stat("examplebot")
    ///     .users_live(120)
    ///     .users_die(0)
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn send_stat(&self, username: impl Into<String>) -> SendStatBuilder<'_> {
        SendStatBuilder::new(self, username.into())
    }

    // Check-task endpoints

    /// Start a background check of a batch of user ids.
    ///
    /// `file` is any format of user-id array (csv, one-per-line, ...),
    /// given as a path or an open stream. Requires a bot token (instance
    /// or builder) and the instance access key.
    ///
    /// # Example
    /// ```no_run
    /// # use botstat_client::BotStatClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = BotStatClient::new()
    ///     .with_token("123:ABC")
    ///     .with_access_key("KEY");
    /// let task = client.create_task("ids.csv").send().await?;
    /// let status = client.get_task_status(&task.id).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn create_task(&self, file: impl Into<UploadFile>) -> CreateTaskBuilder<'_> {
        CreateTaskBuilder::new(self, file.into())
    }

    /// Cancel a check task.
    ///
    /// # Errors
    /// `Api` when the task id is unknown or already finished.
    pub async fn cancel_task(&self, task_id: &str) -> Result<bool> {
        let url = self.url(&format!("/cancel/{task_id}"))?;
        let envelope = self.request(Method::DELETE, url, None).await?;
        Ok(envelope.ok)
    }

    /// Poll the current state of a check task.
    ///
    /// # Errors
    /// `Api` when the task id is unknown.
    pub async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = self.url(&format!("/status/{task_id}"))?;
        let envelope = self.request(Method::GET, url, None).await?;
        Ok(envelope.decode()?)
    }

    // Companion-bot endpoints

    /// Check a subscription code issued by @BotMembersRobot.
    ///
    /// # Errors
    /// `Api` when the code/user pair does not verify.
    pub async fn check_sub(&self, code: &str, user_id: i64) -> Result<bool> {
        let url = self.url(&format!("/checksub/{code}/{user_id}"))?;
        let envelope = self.request(Method::GET, url, None).await?;
        Ok(envelope.ok)
    }

    /// Forward a database of chat ids to @BotManRobot.
    ///
    /// Allowed file formats: txt, csv, xls, xlsx, json — opaque to this
    /// client. Requires a bot token (instance or builder).
    #[must_use]
    pub fn send_to_botman(
        &self,
        owner_id: i64,
        file: impl Into<UploadFile>,
    ) -> SendToBotmanBuilder<'_> {
        SendToBotmanBuilder::new(self, owner_id, file.into())
    }

    /// Pause or resume the running @BotManRobot job.
    ///
    /// Uses the instance bot token unless the builder overrides it.
    ///
    /// # Example
    /// ```no_run
    /// # use botstat_client::BotStatClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = BotStatClient::new().with_token("123:ABC");
    /// client.botman_pause().send().await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn botman_pause(&self) -> BotmanPauseBuilder<'_> {
        BotmanPauseBuilder::new(self)
    }
}

/// Builder for pausing or resuming a @BotManRobot job
#[derive(Debug)]
pub struct BotmanPauseBuilder<'a> {
    client: &'a BotStatClient,
    token: Option<String>,
}

impl<'a> BotmanPauseBuilder<'a> {
    fn new(client: &'a BotStatClient) -> Self {
        Self {
            client,
            token: None,
        }
    }

    /// Override the instance bot token for this call only.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Execute the request
    ///
    /// # Errors
    /// `Configuration` when neither a builder nor an instance token is
    /// available.
    pub async fn send(self) -> Result<bool> {
        let token = self.client.token_or(self.token.as_deref())?;
        let url = self.client.url(&format!("/botman-pause/{token}"))?;
        let envelope = self.client.request(Method::GET, url, None).await?;
        Ok(envelope.ok)
    }
}

/// Builder for starting a check task with optional parameters
#[derive(Debug)]
pub struct CreateTaskBuilder<'a> {
    client: &'a BotStatClient,
    file: UploadFile,
    token: Option<String>,
    notify_id: Option<i64>,
}

impl<'a> CreateTaskBuilder<'a> {
    fn new(client: &'a BotStatClient, file: UploadFile) -> Self {
        Self {
            client,
            file,
            token: None,
            notify_id: None,
        }
    }

    /// Override the instance bot token for this task only.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Chat id to receive a completion notification from @BotSafeRobot.
    #[must_use]
    pub fn notify_id(mut self, notify_id: i64) -> Self {
        self.notify_id = Some(notify_id);
        self
    }

    /// Execute the request
    ///
    /// # Errors
    /// `Configuration` when neither a builder nor an instance token (or no
    /// access key) is available; `UnsupportedInput`/`Io` when the upload
    /// source cannot be read.
    pub async fn send(self) -> Result<TaskId> {
        let token = self.client.token_or(self.token.as_deref())?;
        let access_key = self.client.access_key_or(None)?;
        let mut url = self.client.url(&format!("/create/{token}/{access_key}"))?;
        if let Some(notify_id) = self.notify_id {
            url.query_pairs_mut()
                .append_pair("notify_id", &notify_id.to_string());
        }

        let form = self.file.into_form().await?;
        let envelope = self.client.request(Method::POST, url, Some(form)).await?;
        Ok(envelope.decode()?)
    }
}

/// Builder for reporting statistics with optional counts
#[derive(Debug)]
pub struct SendStatBuilder<'a> {
    client: &'a BotStatClient,
    username: String,
    access_key: Option<String>,
    owner: Option<i64>,
    users_live: Option<i64>,
    users_die: Option<i64>,
    groups_live: Option<i64>,
    groups_die: Option<i64>,
    users_in_groups: Option<i64>,
}

impl<'a> SendStatBuilder<'a> {
    fn new(client: &'a BotStatClient, username: String) -> Self {
        Self {
            client,
            username,
            access_key: None,
            owner: None,
            users_live: None,
            users_die: None,
            groups_live: None,
            groups_die: None,
            users_in_groups: None,
        }
    }

    /// Override the instance access key for this report only.
    #[must_use]
    pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Owner chat id, to bind the bot to an account.
    #[must_use]
    pub fn owner(mut self, owner: i64) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Count of live users.
    #[must_use]
    pub fn users_live(mut self, count: i64) -> Self {
        self.users_live = Some(count);
        self
    }

    /// Count of dead users.
    #[must_use]
    pub fn users_die(mut self, count: i64) -> Self {
        self.users_die = Some(count);
        self
    }

    /// Count of live groups.
    #[must_use]
    pub fn groups_live(mut self, count: i64) -> Self {
        self.groups_live = Some(count);
        self
    }

    /// Count of dead groups.
    #[must_use]
    pub fn groups_die(mut self, count: i64) -> Self {
        self.groups_die = Some(count);
        self
    }

    /// Count of users seen in groups.
    #[must_use]
    pub fn users_in_groups(mut self, count: i64) -> Self {
        self.users_in_groups = Some(count);
        self
    }

    /// Execute the request
    ///
    /// # Errors
    /// `Configuration` when no access key is available.
    pub async fn send(self) -> Result<bool> {
        let access_key = self.client.access_key_or(self.access_key.as_deref())?;
        let mut url = self.client.url(&format!("/send-stat/{access_key}"))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("username", &self.username);
            if let Some(owner) = self.owner {
                query.append_pair("owner", &owner.to_string());
            }
            let counts = [
                ("users_live", self.users_live),
                ("users_die", self.users_die),
                ("groups_live", self.groups_live),
                ("groups_die", self.groups_die),
                ("users_in_groups", self.users_in_groups),
            ];
            for (name, count) in counts {
                // Set counts are always sent, zero included.
                if let Some(count) = count {
                    query.append_pair(name, &count.to_string());
                }
            }
        }

        let envelope = self.client.request(Method::GET, url, None).await?;
        Ok(envelope.ok)
    }
}

/// Builder for forwarding a database file to @BotManRobot
#[derive(Debug)]
pub struct SendToBotmanBuilder<'a> {
    client: &'a BotStatClient,
    owner_id: i64,
    file: UploadFile,
    token: Option<String>,
    show_file_result: Option<bool>,
}

impl<'a> SendToBotmanBuilder<'a> {
    fn new(client: &'a BotStatClient, owner_id: i64, file: UploadFile) -> Self {
        Self {
            client,
            owner_id,
            file,
            token: None,
            show_file_result: None,
        }
    }

    /// Override the instance bot token for this upload only.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Allow downloading the file result after the letter.
    #[must_use]
    pub fn show_file_result(mut self, show: bool) -> Self {
        self.show_file_result = Some(show);
        self
    }

    /// Execute the request
    ///
    /// # Errors
    /// `Configuration` when neither a builder nor an instance token is
    /// available; `UnsupportedInput`/`Io` when the upload source cannot
    /// be read.
    pub async fn send(self) -> Result<bool> {
        let token = self.client.token_or(self.token.as_deref())?;
        let mut url = self.client.url(&format!("/botman/{token}"))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("owner_id", &self.owner_id.to_string());
            if let Some(show) = self.show_file_result {
                query.append_pair("show_file_result", &show.to_string());
            }
        }

        let form = self.file.into_form().await?;
        let envelope = self.client.request(Method::POST, url, Some(form)).await?;
        Ok(envelope.ok)
    }
}
