//! Regional Registration Service Library

pub mod admin;
pub mod config;
pub mod http;
pub mod intake;
pub mod lifecycle;
pub mod observability;
pub mod regions;
pub mod storage;

pub use config::schema::RegistryConfig;
pub use http::HttpServer;
pub use intake::IntakeService;
pub use lifecycle::Shutdown;
