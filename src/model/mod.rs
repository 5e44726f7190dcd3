pub mod algorithm;
pub mod events;
pub mod form;
pub mod token;
pub mod user;
