//! Domain logic for clip analysis and composition planning.
//!
//! Everything in this crate is synchronous and side-effect free except for
//! [`ffmpeg`] and [`clip`], which shell out to `ffprobe`/`ffmpeg`.

pub mod assembly;
pub mod clip;
pub mod diff;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod graph;
pub mod label;
pub mod layout;
pub mod table;
pub mod workflow_tags;
