pub mod bus;
pub mod client;
pub mod config;
pub mod likes;
pub mod metrics;
pub mod platform;
pub mod playback;
pub mod protocol;
pub mod sequence;
pub mod session;
pub mod tracking;
