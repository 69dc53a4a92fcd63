pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod firestore;
pub mod logging;
pub mod model;
pub mod presale;
pub mod transactions;
pub mod wallet;
