//! Source texture access: the reader contract the content layer
//! implements, two stock readers, and the per-session source cache.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use retex_spec::TextureTag;

use crate::buffer::TextureBuffer;
use crate::error::BuildError;
use crate::png::{self, PngConfig};

/// Contract to the file/content layer. The engine never walks the disk
/// itself; it asks the reader which candidate files exist for a tag and
/// opens them as byte streams.
pub trait InputReader {
    /// Candidate file paths for a texture tag, best match first.
    /// Returned paths are existence-checked by the implementation.
    fn enumerate(&self, tag: TextureTag) -> Vec<PathBuf>;

    /// Open a byte stream for a previously enumerated path.
    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read>>;
}

/// Directory-backed reader: looks for `<tag>.png` under a root.
pub struct DirReader {
    root: PathBuf,
}

impl DirReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl InputReader for DirReader {
    fn enumerate(&self, tag: TextureTag) -> Vec<PathBuf> {
        let path = self.root.join(format!("{}.png", tag.as_str()));
        if path.is_file() {
            vec![path]
        } else {
            Vec::new()
        }
    }

    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(std::fs::File::open(path)?))
    }
}

/// In-memory reader for tests and embedders.
#[derive(Default)]
pub struct MemoryReader {
    entries: Vec<(TextureTag, PathBuf, Vec<u8>)>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register raw file bytes under a tag.
    pub fn insert(&mut self, tag: TextureTag, name: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.entries.push((tag, name.into(), bytes));
    }

    /// Encode a buffer as PNG and register it as `<tag>.png`.
    pub fn insert_buffer(
        &mut self,
        tag: TextureTag,
        buffer: &TextureBuffer,
    ) -> Result<(), crate::png::PngError> {
        let (data, _) = png::write_rgba_to_vec_with_hash(buffer, &PngConfig::default())?;
        self.insert(tag, format!("{}.png", tag.as_str()), data);
        Ok(())
    }
}

impl InputReader for MemoryReader {
    fn enumerate(&self, tag: TextureTag) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(t, _, _)| *t == tag)
            .map(|(_, path, _)| path.clone())
            .collect()
    }

    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read>> {
        for (_, p, bytes) in &self.entries {
            if p == path {
                return Ok(Box::new(Cursor::new(bytes.clone())));
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such entry: {}", path.display()),
        ))
    }
}

/// Cached metadata for one opened source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSource {
    pub width: u32,
    pub height: u32,
    /// `height / width` when the material is animated, else 1.
    pub frame_count: u32,
}

impl TextureSource {
    /// Height of a single animation frame.
    pub fn frame_height(&self) -> u32 {
        (self.height / self.frame_count.max(1)).max(1)
    }
}

/// Per-material-session cache of decoded sources. Lookups after the
/// first are O(1); entries are immutable until [`SourceCache::clear`].
///
/// Not thread-safe for concurrent writers: materials built in parallel
/// each use their own cache instance.
pub struct SourceCache {
    animated: bool,
    images: HashMap<PathBuf, Arc<TextureBuffer>>,
    meta: HashMap<PathBuf, TextureSource>,
}

impl SourceCache {
    pub fn new(animated: bool) -> Self {
        Self {
            animated,
            images: HashMap::new(),
            meta: HashMap::new(),
        }
    }

    fn load(&mut self, reader: &dyn InputReader, path: &Path) -> Result<(), BuildError> {
        if self.images.contains_key(path) {
            return Ok(());
        }
        let stream = reader.open(path)?;
        let image = png::decode(stream).map_err(|e| BuildError::source(path, e))?;
        let frame_count = if self.animated && image.width > 0 {
            (image.height / image.width).max(1)
        } else {
            1
        };
        self.meta.insert(
            path.to_path_buf(),
            TextureSource {
                width: image.width,
                height: image.height,
                frame_count,
            },
        );
        self.images.insert(path.to_path_buf(), Arc::new(image));
        Ok(())
    }

    /// Cached metadata for a path, decoding on first use.
    pub fn metadata(
        &mut self,
        reader: &dyn InputReader,
        path: &Path,
    ) -> Result<&TextureSource, BuildError> {
        self.load(reader, path)?;
        Ok(&self.meta[path])
    }

    /// Cached decoded image for a path, decoding on first use.
    pub fn image(
        &mut self,
        reader: &dyn InputReader,
        path: &Path,
    ) -> Result<Arc<TextureBuffer>, BuildError> {
        self.load(reader, path)?;
        Ok(Arc::clone(&self.images[path]))
    }

    /// Drop every cached entry; subsequent lookups re-open their files.
    pub fn clear(&mut self) {
        self.images.clear();
        self.meta.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn reader_with(tag: TextureTag, width: u32, height: u32) -> MemoryReader {
        let mut reader = MemoryReader::new();
        let buffer = TextureBuffer::new(width, height, Color::gray(0.5));
        reader.insert_buffer(tag, &buffer).unwrap();
        reader
    }

    #[test]
    fn animated_frame_count_is_height_over_width() {
        let reader = reader_with(TextureTag::Albedo, 16, 64);
        let mut cache = SourceCache::new(true);
        let path = reader.enumerate(TextureTag::Albedo).remove(0);
        let meta = cache.metadata(&reader, &path).unwrap();
        assert_eq!(meta.frame_count, 4);
        assert_eq!(meta.frame_height(), 16);
    }

    #[test]
    fn unanimated_sources_have_one_frame() {
        let reader = reader_with(TextureTag::Albedo, 16, 64);
        let mut cache = SourceCache::new(false);
        let path = reader.enumerate(TextureTag::Albedo).remove(0);
        let meta = cache.metadata(&reader, &path).unwrap();
        assert_eq!(meta.frame_count, 1);
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let reader = reader_with(TextureTag::Height, 8, 8);
        let mut cache = SourceCache::new(false);
        let path = reader.enumerate(TextureTag::Height).remove(0);
        let first = cache.image(&reader, &path).unwrap();
        let second = cache.image(&reader, &path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_forgets_entries() {
        let reader = reader_with(TextureTag::Height, 8, 8);
        let mut cache = SourceCache::new(false);
        let path = reader.enumerate(TextureTag::Height).remove(0);
        let first = cache.image(&reader, &path).unwrap();
        cache.clear();
        let second = cache.image(&reader, &path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn corrupt_source_is_a_source_error() {
        let mut reader = MemoryReader::new();
        reader.insert(TextureTag::Albedo, "albedo.png", b"not a png".to_vec());
        let mut cache = SourceCache::new(false);
        let path = reader.enumerate(TextureTag::Albedo).remove(0);
        let err = cache.image(&reader, &path).unwrap_err();
        assert!(matches!(err, BuildError::Source { .. }));
    }

    #[test]
    fn missing_entry_is_an_io_error() {
        let reader = MemoryReader::new();
        let mut cache = SourceCache::new(false);
        let err = cache.image(&reader, Path::new("ghost.png")).unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));
    }
}
