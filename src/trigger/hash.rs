use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(?path, hash = %hash, "hashed input file");
    Ok(hash)
}

/// Identifier for a file in content mode: `<path>#<blake3>`.
pub fn content_identity(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let hash = compute_file_hash(fs, path)?;
    Ok(format!("{}#{}", path.display(), hash))
}
