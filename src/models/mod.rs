pub mod account;
pub mod catalog;
pub mod lead;
pub mod partner;
pub mod review;
pub mod user;
