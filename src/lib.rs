pub mod config;
pub mod fetcher;
pub mod inference;
pub mod model;
pub mod reducer;
pub mod session;
