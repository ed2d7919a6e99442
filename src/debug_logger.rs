// Debug logging module for asynchronous decision logging
//
// Fire-and-forget JSONL writes so the move response never waits on disk.
// Each line records one turn's decision next to the board it was made on.

use log::error;
use serde::Serialize;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::match_controller::TurnDecision;
use crate::types::Board;

/// Represents a single debug log entry
#[derive(Debug, Serialize)]
struct DebugLogEntry {
    match_id: String,
    turn: i32,
    chosen_move: String,
    strategy: Option<String>,
    heuristic_move: Option<String>,
    vetoed: bool,
    lose_odds: Option<f64>,
    search_settled: bool,
    board: Board,
    timestamp: String,
}

/// Shared debug logger state
/// Uses Arc<Mutex<File>> to allow concurrent async writes from multiple tasks
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return DebugLogger::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                DebugLogger::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a move decision asynchronously (fire-and-forget)
    pub fn log_decision(&self, match_id: &str, turn: i32, board: Board, decision: &TurnDecision) {
        if !self.enabled {
            return;
        }

        let entry = DebugLogEntry {
            match_id: match_id.to_string(),
            turn,
            chosen_move: decision.direction.as_str().to_string(),
            strategy: decision.strategy.map(|s| s.as_str().to_string()),
            heuristic_move: decision.heuristic.map(|d| d.as_str().to_string()),
            vetoed: decision.vetoed,
            lose_odds: decision.lose_odds,
            search_settled: decision.search_settled,
            board,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let file_handle = self.file.clone();

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: DebugLogEntry) {
        let mut file_guard = file_handle.lock().await;

        let Some(file) = file_guard.as_mut() else {
            return;
        };

        match serde_json::to_string(&entry) {
            Ok(json_line) => {
                let line_with_newline = format!("{}\n", json_line);
                if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                    error!("Failed to write debug log entry: {}", e);
                } else if let Err(e) = file.flush().await {
                    error!("Failed to flush debug log: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize debug log entry: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coord, Direction};

    fn decision() -> TurnDecision {
        TurnDecision {
            direction: Direction::Left,
            strategy: None,
            heuristic: Some(Direction::Up),
            vetoed: true,
            lose_odds: Some(0.25),
            search_settled: false,
        }
    }

    fn board() -> Board {
        Board {
            height: 5,
            width: 5,
            food: vec![Coord::new(1, 1)],
            snakes: vec![],
            hazards: vec![],
        }
    }

    #[tokio::test]
    async fn test_disabled_logger_writes_nothing() {
        let logger = DebugLogger::new(false, "never_created.jsonl").await;
        assert!(!logger.is_enabled());
        logger.log_decision("m", 1, board(), &decision());
        assert!(!std::path::Path::new("never_created.jsonl").exists());
    }

    #[tokio::test]
    async fn test_decision_is_appended_as_json_line() {
        let path = std::env::temp_dir().join("oracle_debug_logger_test.jsonl");
        let path_str = path.to_string_lossy().to_string();
        let logger = DebugLogger::new(true, &path_str).await;
        assert!(logger.is_enabled());

        logger.log_decision("m", 7, board(), &decision());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line["match_id"], "m");
        assert_eq!(line["turn"], 7);
        assert_eq!(line["chosen_move"], "left");
        assert_eq!(line["heuristic_move"], "up");
        assert_eq!(line["vetoed"], true);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
