pub mod analytics;
pub mod assets;
pub mod core;
pub mod import;
pub mod reports;
pub mod students;
pub mod tables;
pub mod university;
