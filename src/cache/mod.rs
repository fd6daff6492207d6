pub mod keys;
pub mod models;
pub mod operations;
