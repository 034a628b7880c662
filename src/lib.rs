// Library exports for Overcastly
// This allows integration tests and the binary to share one module tree

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod geo;
pub mod routes;
pub mod state;
pub mod store;
pub mod threads;
