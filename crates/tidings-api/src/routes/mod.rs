pub mod auth;
pub mod conversations;
pub mod history;
pub mod presence;
