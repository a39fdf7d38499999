pub mod chat;
pub mod conversations;
pub mod events;
pub mod export;
pub mod health;
pub mod system;
