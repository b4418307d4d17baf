pub mod config;
pub mod event;
pub mod game;
pub mod room;
