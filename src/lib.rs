// Library for tests to access modules

pub mod capture;
pub mod config;
pub mod diff;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod sampling;
pub mod store;
