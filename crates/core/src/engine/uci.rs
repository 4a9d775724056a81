//! UCI engine session
//!
//! Spawns the engine as a subprocess and talks to it over stdin/stdout.
//! One request is outstanding at a time: every call takes `&mut self`.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use shakmaty::CastlingMode;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::analysis::{Evaluation, InfoLevel, PositionAnalysis};
use super::Engine;
use crate::game::SearchPosition;

/// Maximum number of lines to read before giving up on a handshake reply
pub const MAX_UCI_LINES: usize = 1000;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// Error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// No executable at the given path
    #[error("engine '{0}' was not found")]
    NotFound(String),

    /// The file exists but may not be executed
    #[error("engine '{0}' could not be executed")]
    NotExecutable(String),

    /// Failed to start the engine process
    #[error("failed to start engine: {0}")]
    Spawn(#[source] io::Error),

    /// The process is gone; the session is unusable
    #[error("engine terminated")]
    Terminated,

    /// Engine returned an unexpected response
    #[error("engine protocol error: {0}")]
    Protocol(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, handshake in progress
    Created,
    /// Accepts analysis requests
    Ready,
    /// Process exited, normally or not
    Terminated,
}

/// A running UCI engine
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    name: String,
    state: SessionState,
    /// Last value sent for `UCI_Chess960`
    chess960: bool,
}

impl UciEngine {
    /// Spawns the engine at `path` and configures it with `threads` search threads
    pub async fn start(path: &str, threads: u32) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => EngineError::NotFound(path.to_string()),
                io::ErrorKind::PermissionDenied => EngineError::NotExecutable(path.to_string()),
                _ => EngineError::Spawn(e),
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("failed to open stdin".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("failed to open stdout".into()))?;

        let mut engine = UciEngine {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::new(),
            state: SessionState::Created,
            chess960: false,
        };

        let handshake = timeout(HANDSHAKE_TIMEOUT, engine.init_uci(threads)).await;
        match handshake {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                engine.quit().await;
                return Err(e);
            }
            Err(_) => {
                engine.quit().await;
                return Err(EngineError::Protocol("no reply to uci handshake".into()));
            }
        }

        info!(engine = %engine.name, threads, "engine ready");
        Ok(engine)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Marks the session dead when the pipe broke
    fn io_failure(&mut self, e: io::Error) -> EngineError {
        match e.kind() {
            io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => {
                self.state = SessionState::Terminated;
                EngineError::Terminated
            }
            _ => EngineError::Io(e),
        }
    }

    /// Sends a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        trace!(cmd, "engine <");
        let written = async {
            self.stdin.write_all(format!("{}\n", cmd).as_bytes()).await?;
            self.stdin.flush().await
        }
        .await;
        written.map_err(|e| self.io_failure(e))
    }

    /// Reads a line from the engine
    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        match self.stdout.read_line(&mut line).await {
            Ok(0) => {
                self.state = SessionState::Terminated;
                Err(EngineError::Terminated)
            }
            Ok(_) => {
                let line = line.trim().to_string();
                trace!(line = %line, "engine >");
                Ok(line)
            }
            Err(e) => Err(self.io_failure(e)),
        }
    }

    /// Reads lines until one starts with `expected`
    async fn read_until(&mut self, expected: &str) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line().await?;
            let done = line.starts_with(expected);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
        Err(EngineError::Protocol(format!("expected '{}'", expected)))
    }

    /// Initialize UCI protocol
    async fn init_uci(&mut self, threads: u32) -> Result<(), EngineError> {
        self.send("uci").await?;
        let lines = self.read_until("uciok").await?;
        self.name = lines
            .iter()
            .find_map(|l| l.strip_prefix("id name "))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown engine".to_string());

        self.send(&format!("setoption name Threads value {}", threads))
            .await?;
        self.send("isready").await?;
        self.read_until("readyok").await?;

        self.state = SessionState::Ready;
        Ok(())
    }

    /// Quit the engine cleanly. Safe to call more than once.
    pub async fn quit(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;
        let _ = self.send("quit").await;
        if timeout(QUIT_GRACE, self.process.wait()).await.is_err() {
            warn!(engine = %self.name, "engine ignored quit, killing it");
            let _ = self.process.kill().await;
        }
        debug!(engine = %self.name, "engine stopped");
    }
}

impl Engine for UciEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &mut self,
        position: &SearchPosition,
        seconds: f64,
        info: InfoLevel,
    ) -> Result<PositionAnalysis, EngineError> {
        if self.state != SessionState::Ready {
            return Err(EngineError::Terminated);
        }

        let chess960 = position.castling_mode() == CastlingMode::Chess960;
        if chess960 != self.chess960 {
            self.send(&format!("setoption name UCI_Chess960 value {}", chess960))
                .await?;
            self.chess960 = chess960;
        }

        let movetime = (seconds * 1000.0).round().max(1.0) as u64;
        self.send(&position.uci_command()).await?;
        self.send(&format!("go movetime {}", movetime)).await?;

        let mut analysis = PositionAnalysis::new(position.turn());
        loop {
            let line = self.read_line().await?;
            if line.starts_with("bestmove") {
                break;
            } else if line.starts_with("info") {
                parse_info_line(&line, &mut analysis);
            }
        }

        Ok(analysis.restrict(info))
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}

/// Folds one `info` line into `analysis`.
///
/// Lines for secondary multipv slots are ignored; tokens the crate does not
/// use (seldepth, hashfull, bounds, ...) are skipped.
pub fn parse_info_line(line: &str, analysis: &mut PositionAnalysis) {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if let Some(i) = parts.iter().position(|p| *p == "multipv") {
        if parts.get(i + 1).and_then(|v| v.parse::<u32>().ok()).unwrap_or(1) > 1 {
            return;
        }
    }

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(depth) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    analysis.depth = Some(depth);
                }
                i += 2;
            }
            "nodes" => {
                if let Some(nodes) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    analysis.nodes = Some(nodes);
                }
                i += 2;
            }
            "score" => {
                let value = parts.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                match (parts.get(i + 1), value) {
                    (Some(&"cp"), Some(cp)) => analysis.evaluation = Some(Evaluation::Centipawns(cp)),
                    (Some(&"mate"), Some(m)) => analysis.evaluation = Some(Evaluation::Mate(m)),
                    _ => {}
                }
                i += 3;
            }
            "pv" => {
                analysis.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            "string" => break,
            _ => i += 1,
        }
    }
}
