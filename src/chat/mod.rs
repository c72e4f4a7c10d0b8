//! The streaming chat layer: transcript state, wire protocol, frame
//! parsing, the turn orchestrator, and the HTTP endpoint.

pub mod frames;
pub mod orchestrator;
pub mod protocol;
pub mod routes;
pub mod scrape;
pub mod transcript;
pub mod transport;

pub use frames::FrameParser;
pub use orchestrator::{ChatOrchestrator, ChatTransport, GENERIC_TURN_ERROR, TurnOutcome};
pub use protocol::{ChatRequest, ResultPayload, STATUS_SCRAPING_OFFERED, StreamEvent, WireMessage};
pub use routes::{ChatRouteState, chat_routes};
pub use scrape::{HttpWebsiteScraper, WebsiteScraper, detect_url, is_skip_reply};
pub use transcript::{ChatSnapshot, ChatState, Message, Role};
pub use transport::HttpChatTransport;
