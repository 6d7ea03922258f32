pub mod account_resolver;
pub mod account_store;
pub mod email_service;
pub mod lead_store;
pub mod memory_store;
pub mod messaging;
pub mod otp_service;
pub mod profile_store;
pub mod quote_service;
pub mod rate_limiter;
pub mod review_store;
pub mod sms_service;
pub mod templates;
pub mod token_service;
