pub mod client;
pub mod grant;
pub mod migrate;
