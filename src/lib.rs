pub mod config;
pub mod handlers;
pub mod scan;
pub mod state;
pub mod stream;

pub use config::ServerConfig;
pub use scan::{LineBuffer, LineScanner, MAX_HEIGHT, MAX_LINES, MAX_WIDTH};
pub use state::AppState;
pub use stream::{handle_websocket, SessionRegistry};
