//! One chat turn as an incrementally-observable operation.
//!
//! The orchestrator opens the streaming transport, feeds bytes through
//! the frame parser, exposes the latest `phase` name, and resolves to a
//! single terminal outcome. Only one turn may be in flight at a time; a
//! send while one is pending is a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::RwLock;

use crate::config::CoreConfig;
use crate::error::ChatError;

use super::frames::FrameParser;
use super::protocol::{ChatRequest, ResultPayload, StreamEvent, WireMessage};
use super::transcript::Message;

/// User-facing fallback when the turn fails for any transport-level
/// reason. Raw errors never reach the transcript.
pub const GENERIC_TURN_ERROR: &str =
    "Something went wrong while thinking about that. Please try again.";

/// Byte-stream transport the orchestrator rides on.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, ChatError>>, ChatError>;
}

/// Terminal outcome of one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed(ResultPayload),
    Failed(String),
}

pub struct ChatOrchestrator {
    transport: Arc<dyn ChatTransport>,
    config: CoreConfig,
    in_flight: AtomicBool,
    phase: Arc<RwLock<Option<String>>>,
    /// Bumped on every send so a stale clear task never wipes a newer
    /// turn's phase.
    phase_generation: Arc<AtomicU64>,
}

impl ChatOrchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>, config: CoreConfig) -> Self {
        Self {
            transport,
            config,
            in_flight: AtomicBool::new(false),
            phase: Arc::new(RwLock::new(None)),
            phase_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The most recent `phase` name, or `None` once cleared.
    pub async fn current_phase(&self) -> Option<String> {
        self.phase.read().await.clone()
    }

    /// Run one turn over the full rolling transcript. Returns `None` when
    /// a turn is already in flight.
    pub async fn send(&self, messages: &[Message]) -> Option<TurnOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Chat turn already in flight, ignoring send");
            return None;
        }

        let generation = self.phase_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.run_turn(messages, generation).await;
        self.schedule_phase_clear(generation);
        self.in_flight.store(false, Ordering::SeqCst);
        Some(outcome)
    }

    async fn run_turn(&self, messages: &[Message], generation: u64) -> TurnOutcome {
        let request = ChatRequest {
            messages: messages.iter().map(WireMessage::from_transcript).collect(),
            locale: self.config.locale.clone(),
        };

        let mut stream = match self.transport.open(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open chat stream");
                return TurnOutcome::Failed(GENERIC_TURN_ERROR.to_string());
            }
        };

        let mut parser = FrameParser::new();
        let mut terminal: Option<TurnOutcome> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = %e, "Chat stream read failed");
                    return terminal
                        .unwrap_or_else(|| TurnOutcome::Failed(GENERIC_TURN_ERROR.to_string()));
                }
            };
            let events = match parser.push(&chunk) {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed chat frame");
                    return terminal
                        .unwrap_or_else(|| TurnOutcome::Failed(GENERIC_TURN_ERROR.to_string()));
                }
            };

            for event in events {
                if terminal.is_some() {
                    // The turn is over; late frames are dropped.
                    tracing::debug!("Ignoring frame after terminal event");
                    continue;
                }
                match event {
                    StreamEvent::Phase { name } => {
                        if self.phase_generation.load(Ordering::SeqCst) == generation {
                            *self.phase.write().await = Some(name);
                        }
                    }
                    StreamEvent::Result(payload) => {
                        terminal = Some(TurnOutcome::Completed(payload));
                    }
                    StreamEvent::Error { message } => {
                        terminal = Some(TurnOutcome::Failed(message));
                    }
                }
            }
        }

        terminal.unwrap_or_else(|| {
            tracing::warn!("Chat stream ended without a terminal event");
            TurnOutcome::Failed(GENERIC_TURN_ERROR.to_string())
        })
    }

    /// Clear the exposed phase a beat after the turn ends, unless a newer
    /// turn has started.
    fn schedule_phase_clear(&self, generation: u64) {
        let phase = Arc::clone(&self.phase);
        let current = Arc::clone(&self.phase_generation);
        let delay = self.config.phase_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                *phase.write().await = None;
            }
        });
    }
}
