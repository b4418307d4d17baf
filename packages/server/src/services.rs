pub mod action_service;
pub mod game_service;
pub mod game_store;
pub mod room_service;
