pub mod errors;
pub mod interrupt;
pub mod models;
pub mod providers;
