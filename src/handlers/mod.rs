pub(crate) mod auth_otp;
pub(crate) mod leads;
pub(crate) mod partners;
pub(crate) mod quick_reviews;
pub(crate) mod reviews;
pub(crate) mod users;
