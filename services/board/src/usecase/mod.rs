pub mod account;
pub mod activation;
pub mod comment;
pub mod listing;
pub mod rubric;
