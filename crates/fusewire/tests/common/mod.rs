//! Common test utilities for dispatcher integration tests.

pub mod harness;

pub use harness::{
    MemoryChannel, ParsedReply, ReadMode, RecordingFs, handshake, init_message, message,
    raw_message, roundtrip, server,
};
