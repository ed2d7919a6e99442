// Welcome to
// __________         __    __  .__                               __
// \______   \_____ _/  |__/  |_|  |   ____   ______ ____ _____  |  | __ ____
//  |    |  _/\__  \\   __\   __\  | _/ __ \ /  ___//    \\__  \ |  |/ // __ \
//  |    |   \ / __ \|  |  |  | |  |_\  ___/ \___ \|   |  \/ __ \|    <\  ___/
//  |________/(______/__|  |__| |____/\_____>______>___|__(______/__|__\\_____>
//
// The bot owns the one search engine of the process and a controller per
// running match. Endpoint handlers call straight into it.

use log::info;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::match_controller::MatchController;
use crate::search_engine::SearchEngine;
use crate::types::{Battlesnake, Board, Game};

type SharedController = Arc<tokio::sync::Mutex<MatchController>>;

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Arc<Config>,
    engine: SearchEngine,
    matches: Mutex<HashMap<String, SharedController>>,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Bot::with_logger(config, DebugLogger::disabled())
    }

    pub fn with_logger(config: Config, debug_logger: DebugLogger) -> Self {
        let engine = SearchEngine::new(config.search.clone(), config.game_rules.clone());
        Bot {
            config: Arc::new(config),
            engine,
            matches: Mutex::new(HashMap::new()),
            debug_logger,
        }
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "ksiopiolosz-aterlo",
            "color": "#C0FFEE",
            "head": "default",
            "tail": "default",
        })
    }

    fn controller_for(&self, game: &Game, board: &Board) -> (SharedController, bool) {
        let mut matches = self.matches.lock();
        if let Some(existing) = matches.get(&game.id) {
            return (existing.clone(), false);
        }

        let controller = Arc::new(tokio::sync::Mutex::new(MatchController::new(
            game,
            board,
            self.config.clone(),
        )));
        matches.insert(game.id.clone(), controller.clone());
        (controller, true)
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub async fn start(&self, game: &Game, _turn: &i32, board: &Board, you: &Battlesnake) {
        info!("GAME START {} (timeout {}ms)", game.id, game.timeout);

        let (controller, _) = self.controller_for(game, board);
        controller.lock().await.on_start(board, you, &self.engine);
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// Re-roots the engine on the observed state, takes a heuristic guess
    /// while the engine keeps searching, then lets the engine's odds veto it
    /// once the search settles or the deadline approaches.
    pub async fn get_move(&self, game: &Game, turn: &i32, board: &Board, you: &Battlesnake) -> Value {
        let started = Instant::now();

        let (controller, created) = self.controller_for(game, board);
        if created {
            info!("Turn {}: move for unknown match {}, starting fresh", turn, game.id);
        }

        let mut controller = controller.lock().await;
        let decision = controller
            .on_move(*turn, board, you, started, &self.engine)
            .await;

        self.debug_logger
            .log_decision(controller.match_id(), *turn, board.clone(), &decision);

        json!({ "move": decision.direction.as_str() })
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub async fn end(&self, game: &Game, _turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME OVER {}", game.id);

        let controller = self.matches.lock().remove(&game.id);
        match controller {
            Some(controller) => controller.lock().await.on_end(&self.engine),
            None => {
                self.engine.remove_match(&game.id);
            }
        }
    }

    /// Forgets every match and resets the engine
    pub fn purge(&self) {
        info!("PURGE");
        self.matches.lock().clear();
        self.engine.reset();
    }

    pub fn running_matches(&self) -> usize {
        self.matches.lock().len()
    }
}
