//! Typed handle for a source-manager entry.

/// Identifies one file entry of the [`SourceManager`].
///
/// Each *inclusion* of a file gets its own `FileId`: including the same
/// header twice creates two entries with distinct ids, each with its own
/// offset range. Ids are handed out in translation-unit order, so sorting
/// by `FileId` sorts files by first appearance.
///
/// [`SourceManager`]: crate::SourceManager
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct FileId(u32);

crate::static_assert_size!(FileId, 4);

impl FileId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        FileId(index as u32)
    }

    /// Index of the entry inside the source manager.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw `u32` value, for display purposes.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}
