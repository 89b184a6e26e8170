pub mod catalog;
pub mod contractors;
pub mod export;
pub mod health;
pub mod imports;
pub mod jobs;
pub mod maintenance;
pub mod stats;
