pub mod auth_otp_routes;
pub mod leads;
pub mod partners;
pub mod quick_reviews;
pub mod reviews;
pub mod users;
