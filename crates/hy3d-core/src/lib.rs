//! hy3d Core - Foundational types shared by the hy3d crates
//!
//! - `Hy3dError` / `Result` - the error taxonomy of the generation workflow
//! - `hints` - static explanations for known remote error codes
//! - `ContentHash` - SHA-256 content hashing for filenames and downloads

mod error;
mod hash;
pub mod hints;

pub use error::{Hy3dError, Result};
pub use hash::ContentHash;
