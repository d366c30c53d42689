//! Event envelopes.
//!
//! An envelope is the canonical `{header, body}` shape of every event the
//! relay logs or publishes. The header is owned by the handler; the body is
//! forwarded untouched.

pub mod envelope;

pub use envelope::{
    build_envelope, decode, encode, EnvelopeError, EnvelopeSpec, EventEnvelope, EventHeader,
};
