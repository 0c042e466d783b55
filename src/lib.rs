pub mod config;
pub mod csv;
pub mod fetch;
pub mod kiosk;
pub mod reload;
pub mod render;
pub mod scroll;
