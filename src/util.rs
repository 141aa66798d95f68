//! Utility functions for secure path handling and identifier digests

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Validate and resolve an output path, ensuring it stays within the output directory
/// Returns an error if the path attempts to escape the base directory
pub fn secure_path(base: &Path, relative: &str) -> io::Result<PathBuf> {
    let mut result = base.to_path_buf();

    for component in relative.split(|c| c == '/' || c == '\\') {
        match component {
            "" => continue,  // Skip empty components
            "." => continue, // Current directory - no-op
            ".." => {
                // Output files never climb out of their directory
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Path traversal detected: cannot escape output directory",
                ));
            }
            _ => {
                // Check for Windows drive prefixes
                if component.len() >= 2 && component.as_bytes()[1] == b':' {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Absolute paths are not allowed",
                    ));
                }
                result.push(component);
            }
        }
    }

    // Final check: ensure the resolved path is within the base
    // Use dunce::canonicalize if base exists to avoid UNC prefix on Windows
    if base.exists() && result.exists() {
        let canonical_base = dunce::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
        let canonical_result = dunce::canonicalize(&result).unwrap_or_else(|_| result.clone());
        if !canonical_result.starts_with(&canonical_base) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Path traversal detected: resolved path escapes output directory",
            ));
        }
    } else if !result.starts_with(base) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Path traversal detected: resolved path escapes output directory",
        ));
    }

    Ok(result)
}

/// First 16 bytes of the SHA256 digest of a key
///
/// Seeds reproducible identifiers: equal keys give equal bytes across runs.
pub fn digest16(key: &str) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    bytes
}

/// Display a path with forward slashes (cross-platform standard)
/// Converts Windows backslashes to forward slashes for consistent output
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
