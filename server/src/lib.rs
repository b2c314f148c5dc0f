pub mod api;
pub mod bitmap;
pub mod error;
pub mod routes;
