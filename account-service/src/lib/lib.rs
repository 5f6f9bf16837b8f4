pub mod config;
pub mod domain;

pub use domain::otp;
pub use domain::session;
pub use domain::user;
