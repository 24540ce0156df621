pub mod activity;
pub mod application;
pub mod date_text;
pub mod domain;
pub mod error;
pub mod ports;
pub mod store;
pub mod utils;

pub use error::CoreError;
