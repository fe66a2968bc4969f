pub mod kraken;

pub use kraken::{HttpTransport, KrakenClient, Transport};
