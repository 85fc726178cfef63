pub mod chat;
pub mod init;
pub mod lorebook;
pub mod search;
