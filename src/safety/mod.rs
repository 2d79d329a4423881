//! Submission gating: the cooldown window and the in-flight guard.

pub mod cooldown;
