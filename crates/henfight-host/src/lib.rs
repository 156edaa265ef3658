pub mod bot;
pub mod config;
pub mod game_loop;
pub mod world;
