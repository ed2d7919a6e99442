// Library exports for the oracle snake
// The binary and the integration tests both drive the bot through these

pub mod agent;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod match_controller;
pub mod pathfinding;
pub mod safety;
pub mod scenario;
pub mod scenario_tree;
pub mod search_engine;
pub mod strategies;
pub mod types;
