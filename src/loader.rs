//! Loads a raw big-endian memory image from disk into a [`Memory`].

use std::path::Path;

use crate::error::LoadError;
use crate::memory::{Memory, BYTE_COUNT};

/// Reads `path` and copies its bytes verbatim into the start of `memory`.
/// The file is already the machine's native big-endian word layout, so no
/// byte-swapping happens here; `Memory::read_word`/`write_word` do that on
/// every access instead.
pub fn load_file(path: &Path, memory: &mut Memory) -> Result<(), LoadError> {
    let data = std::fs::read(path)?;
    load_bytes(&data, memory)
}

/// Same as [`load_file`] but from an in-memory byte slice, for embedding or
/// for tests that build an image without touching the filesystem.
pub fn load_bytes(data: &[u8], memory: &mut Memory) -> Result<(), LoadError> {
    if data.len() > BYTE_COUNT {
        return Err(LoadError::Oversize {
            max: BYTE_COUNT,
            actual: data.len(),
        });
    }
    memory.raw_bytes_mut()[..data.len()].copy_from_slice(data);
    Ok(())
}
