pub mod mail;
pub mod repositories;

pub use mail::LogMailer;
