//! Route tree.
//!
//! ```text
//! GET  /health      service health and ffmpeg version
//! POST /analyze     probe clips and resolve their workflows
//! POST /probe       one clip's width, height and fps
//! POST /export      compose clips into one video
//! POST /review      headers, hiding, search, sort and diffs
//! ```

pub mod clips;
pub mod health;
