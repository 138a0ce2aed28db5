pub mod export;
pub mod init;
pub mod list;
pub mod note;
pub mod report;
pub mod show;
pub mod status;
