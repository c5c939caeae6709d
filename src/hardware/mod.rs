//! Sonar Hardware
//!
//! - [`capabilities`] - the `ScanningSonar` trait the acquisition code is written against
//! - [`ping_protocol`] - framing and message types of the Ping wire protocol
//! - [`ping360`] - serial driver for the Ping360 head
//! - [`mock`] - simulated head for running without hardware

pub mod capabilities;
pub mod mock;
pub mod ping360;
pub mod ping_protocol;

pub use capabilities::ScanningSonar;
pub use mock::MockSonar;
pub use ping360::Ping360Driver;
