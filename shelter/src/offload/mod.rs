//! Background task execution for host-facing work.
//!
//! Push notifications and notification clicks are handed to the host
//! through [`OffloadManager`] so message handling returns immediately.
//! Tasks are tracked until they finish, which lets callers (and tests)
//! drain them with [`OffloadManager::wait_all`].
//!
//! ```ignore
//! use shelter::offload::{OffloadConfig, OffloadManager};
//!
//! let manager = OffloadManager::new(OffloadConfig::builder().warn_after(Duration::from_secs(2)).build());
//! manager.spawn("push_notification", async { /* show */ });
//! manager.wait_all().await;
//! ```

mod manager;
mod policy;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};
