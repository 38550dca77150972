//! In-process state shared by the request path and the linking flow: the
//! response cache, the in-flight request registry and the user store.

mod cache;
mod dedup;
mod users;

pub use cache::MemoryCache;
pub use cache::SWEEP_INTERVAL;
pub use cache::cache_key;
pub use dedup::RequestDeduplicator;
pub use users::JsonUserStore;
pub use users::MemoryUserStore;
pub use users::UserStore;
