pub mod config;
mod file_version_store;
mod in_memory_store;
mod steam_source;
mod tokio_executor;
mod webhook_sink;

pub use config::{Config, NotifyConfig, RemoteConfig, ServerConfig};
pub use file_version_store::FileVersionStore;
pub use in_memory_store::InMemoryVersionStore;
pub use steam_source::SteamRemoteSource;
pub use tokio_executor::TokioServerExecutor;
pub use webhook_sink::{LogNotificationSink, WebhookNotificationSink};
