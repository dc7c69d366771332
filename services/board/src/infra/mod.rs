pub mod captcha;
pub mod db;
pub mod mailer;
pub mod storage;
