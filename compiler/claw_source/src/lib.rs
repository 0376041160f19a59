//! Source locations, files and the source manager for the claw toolkit.
//!
//! This crate contains the location algebra everything else builds on:
//! - [`SourceLocation`]: a compact 4-byte opaque location, either a *file*
//!   location (real source text) or a *macro* location (token synthesized by
//!   a macro expansion)
//! - [`SourceRange`]: a pair of locations delimiting a token range
//! - [`FileId`]: a handle for one entry of the source manager
//! - [`SourceManager`]: owns file buffers and macro-expansion records, and
//!   answers every location query (decompose, compose, expansion walking,
//!   translation-unit ordering)
//!
//! # Design
//!
//! All entries, file buffers and macro expansions alike, are allocated in
//! one shared 31-bit offset space, in the order the preprocessor encounters
//! them. Bit 31 of a location's raw encoding marks macro locations. This
//! keeps locations `Copy` and 4 bytes wide while letting the manager recover
//! the owning entry with a binary search.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod file_id;
mod location;
mod source_manager;

pub use file_id::FileId;
pub use location::{SourceLocation, SourceRange};
pub use source_manager::{SourceError, SourceManager};
