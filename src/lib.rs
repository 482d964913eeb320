// Client for the veil.co prediction-market API and the 0x v2 exchange
// contracts it settles on.

pub mod config;
pub mod de;
pub mod error;
pub mod network;
pub mod telemetry;
pub mod units;
pub mod veil;
pub mod zeroex;

pub use config::Settings;
pub use error::{Result, VeilError};
pub use network::NetworkId;
pub use veil::VeilClient;
