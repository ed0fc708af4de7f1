pub mod api;
pub mod config;
pub mod filter;
pub mod http;
pub mod session;
pub mod store;

pub use self::config::Config;
