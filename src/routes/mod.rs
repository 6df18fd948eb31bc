pub mod confirm_email;
pub mod contacts;
pub mod health;
pub mod login;
pub mod refresh;
pub mod request_email;
pub mod signup;
pub mod users;
