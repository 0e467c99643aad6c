pub mod battle;
pub mod bot;
pub mod config;
pub mod error;
pub mod feed;
pub mod participant;
pub mod question;
pub mod scoring;
pub mod server;
pub mod timer;
