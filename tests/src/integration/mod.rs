//! # Integration Flows
//!
//! Each module drives a controller against either a live dispatcher or a
//! scripted peer and checks what the consumer observes.

pub mod flows;
pub mod shutdown;
pub mod transfer;
