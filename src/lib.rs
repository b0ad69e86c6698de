//! Classifies derivative Creation-Engine mod assets against a reference
//! tree, packs the safe subset into chunked native archives, and assembles
//! a distributable bundle alongside an independent loose-file container.
//!
//! See [`packager::Packager`] for the single-mod entry point and
//! [`batch::process_collection`] for multi-mod collections.

pub mod archive;
pub mod batch;
pub mod cancel;
pub mod chunk;
pub mod classify;
pub mod compress;
pub mod error;
pub mod game;
pub mod hash;
pub mod logging;
pub mod metadata;
pub mod packager;
pub mod path;
pub mod plugin;
pub mod progress;
pub mod scanner;

/// The crate version, recorded in `package_info.json` for forward debugging.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
