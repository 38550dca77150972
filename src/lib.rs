//! # utafm
//!
//! Links chat users to their Last.fm accounts and serves their listening data.
//!
//! The interesting parts are the linking flow, where an HTTP redirect, a
//! background poller and a manual confirmation race to complete one OAuth
//! attempt exactly once, and the Last.fm access layer, which caches reads,
//! collapses identical in-flight requests and retries transient failures.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the OAuth callback listener
//! - `cli` - Command implementations behind the binary
//! - `config` - Environment-driven configuration
//! - `error` - Error types
//! - `lastfm` - Last.fm client, request signing, retries and the cached facade
//! - `link` - Account linking coordinator
//! - `logging` - Tracing subscriber setup
//! - `management` - Response cache, request deduplication and user storage
//! - `server` - Callback listener routing and lifecycle
//! - `types` - Sessions, link outcomes and Last.fm payloads
//! - `utils` - Periods, image selection and small helpers

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod lastfm;
pub mod link;
pub mod logging;
pub mod management;
pub mod server;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Accepts the same arguments as `println!`.
///
/// # Example
///
/// ```ignore
/// info!("Waiting for authorization...");
/// info!("{}.", source.describe());
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```ignore
/// success!("Linked {} to {}.", requester, username);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits with code 1.
///
/// Only for fatal errors in command implementations; library code returns
/// typed errors instead.
///
/// # Example
///
/// ```ignore
/// let config = match Config::from_env() {
///     Ok(c) => c,
///     Err(e) => error!("Invalid configuration. Err: {}", e),
/// };
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```ignore
/// warning!("No linked accounts yet.");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
