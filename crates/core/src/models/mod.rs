pub mod analytics;
pub mod dividend;
pub mod fund;
pub mod history;
pub mod ingestion;
pub mod portfolio;
pub mod price;
pub mod settings;
pub mod transaction;
