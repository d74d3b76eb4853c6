pub mod admin;
pub mod api;
pub mod auth;
pub mod bracket;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod flash;
pub mod history;
pub mod http_client;
pub mod import_template;
pub mod logging;
pub mod model;
pub mod polling;
pub mod standings;
pub mod state;
pub mod token_store;
pub mod transport;
pub mod views;
