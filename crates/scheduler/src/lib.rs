//! Per-session dispatch serialization.
//!
//! The page automation capability is not safe for concurrent use on one
//! context, so every driver operation goes through [`SessionGate`]: one
//! in-flight operation per session id, waiters served in submission order.
//! Operations against different session ids interleave freely.

mod gate;

pub use gate::SessionGate;
