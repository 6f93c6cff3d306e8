//! Messaging-channel gateway: the command grammar, pairing codes, and the
//! router shared by every chat transport.

pub mod command;
pub mod pairing;
pub mod router;

pub use command::{ChannelCommand, CommandParseError, parse_command};
pub use pairing::{IssuedCode, PairingError, issue_pairing_code, redeem_pairing_code};
pub use router::{ChannelRouter, RouterSettings};
