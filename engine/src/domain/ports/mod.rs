mod notification_sink;
mod remote_source;
mod server_executor;
mod version_store;

pub use notification_sink::NotificationSink;
pub use remote_source::RemoteContentSource;
pub use server_executor::{ServerExecutor, ServerProcess, SpawnConfig};
pub use version_store::VersionStore;
