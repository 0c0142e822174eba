pub mod analytics_service;
pub mod dividend_service;
pub mod ingestion_service;
pub mod ledger_service;
pub mod valuation_service;
