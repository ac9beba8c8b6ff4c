pub mod models;
pub mod retrieve;
