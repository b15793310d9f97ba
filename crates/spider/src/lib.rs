pub mod cache;
pub mod error;
pub mod providers;
pub mod scheduler;
pub mod wiki;

pub use error::Error;

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use dotenv::var;
    pub(crate) use reqwest::Client as HttpClient;
}
