pub mod api;
pub mod events;
pub mod ids;
pub mod models;
