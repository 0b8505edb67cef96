pub mod backup;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod init;
pub mod log;
pub mod perimeter;
pub mod serve;
pub mod user;
