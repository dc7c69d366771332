pub mod accounts;
pub mod listings;
pub mod pages;
pub mod view;
