//! chatbridge: a WhatsApp front end for a knowledge-base backend.
//!
//! Inbound text, voice notes and images are normalized into a single
//! textual query (Whisper for audio, a vision model for images) and sent
//! to a retrieval service; its answer goes back to the sender as TwiML.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod media;
pub mod providers;
pub mod retrieval;

pub mod composer;

pub mod app;
pub mod webhook;
