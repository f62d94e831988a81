//! Request handlers.
//!
//! Handlers stage uploads, delegate to `clipgrid_core` and
//! `clipgrid_pipeline`, and map errors via [`AppError`](crate::error::AppError).

pub mod clips;
pub mod export;
pub mod review;
