pub mod email;
pub mod images;
pub mod redis;
