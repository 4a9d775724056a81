//! Chess engine integration
//!
//! Provides interface to UCI-compatible engines like Stockfish.

pub mod analysis;
#[cfg(test)]
pub mod mock;
pub mod uci;

pub use analysis::{Evaluation, InfoLevel, PositionAnalysis};
pub use uci::{EngineError, SessionState, UciEngine};

use crate::game::SearchPosition;

/// An analysis engine session.
///
/// Implementations serve one request at a time; callers hold `&mut` for the
/// whole request.
#[allow(async_fn_in_trait)]
pub trait Engine {
    /// Self-reported engine identity
    fn name(&self) -> &str;

    /// Searches `position` for about `seconds` and reports the final info
    async fn analyze(
        &mut self,
        position: &SearchPosition,
        seconds: f64,
        info: InfoLevel,
    ) -> Result<PositionAnalysis, EngineError>;
}
