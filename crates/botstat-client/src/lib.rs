//! botstat-client: async client for the botstat.io HTTP API
//!
//! Wraps the Telegram-bot statistics service at `api.botstat.io`: fetch a
//! bot's statistics snapshot, start/poll/cancel background check tasks,
//! report statistics, verify subscriptions and drive the @BotManRobot
//! companion bot. Every response arrives in the service's `{ok, result}`
//! envelope; anything other than a 200 with `ok: true` surfaces as a typed
//! error.
//!
//! # Example
//!
//! ```no_run
//! use botstat_client::BotStatClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BotStatClient::new()
//!     .with_token("123:ABC")
//!     .with_access_key("KEY");
//!
//! let info = client.get_bot_info("examplebot").await?;
//! println!("{}: {} live users", info.username, info.users_live);
//!
//! let task = client.create_task("user_ids.csv").send().await?;
//! let status = client.get_task_status(&task.id).await?;
//! println!("task {} is {}", task.id, status.status);
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod upload;

pub use botstat_api::{BotInfo, Envelope, TaskId, TaskStatus};
pub use error::{BotStatError, Result};
pub use http::{
    BotStatClient, BotmanPauseBuilder, CreateTaskBuilder, SendStatBuilder, SendToBotmanBuilder,
};
pub use upload::UploadFile;
