//! Replication & change detection (C8): hashes replicated files, flips a
//! `changed` flag on any write that actually altered state, so the parser
//! knows when its persistent cache must be invalidated.

use crate::core::error::Result;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// Copy `src` to `dst`, returning whether `dst`'s contents changed (or
/// `dst` did not previously exist). If `src` does not exist, this is a
/// no-op that reports no change — a missing dependency at generate time is
/// handled by the caller, not by this primitive.
pub fn copy_file(src: &Path, dst: &Path) -> Result<bool> {
    if !src.exists() {
        return Ok(false);
    }

    let before_hash = hash_if_exists(dst)?;
    std::fs::create_dir_all(dst.parent().unwrap_or_else(|| Path::new(".")))?;
    std::fs::copy(src, dst)?;
    let after_hash = hash_if_exists(dst)?;

    Ok(before_hash != after_hash)
}

fn hash_if_exists(path: &Path) -> Result<Option<u64>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(xxh3_64(&bytes)))
}

/// Assign `new_value` to `field` if it differs, reporting whether it
/// changed.
pub fn set_attr<T: PartialEq>(field: &mut T, new_value: T) -> bool {
    if *field != new_value {
        *field = new_value;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_reports_change_on_new_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        let dst = temp.path().join("dst.txt");
        std::fs::write(&src, b"hello").unwrap();

        assert!(copy_file(&src, &dst).unwrap());
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello");
    }

    #[test]
    fn test_copy_file_reports_no_change_for_identical_contents() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        let dst = temp.path().join("dst.txt");
        std::fs::write(&src, b"same").unwrap();
        std::fs::write(&dst, b"same").unwrap();

        assert!(!copy_file(&src, &dst).unwrap());
    }

    #[test]
    fn test_set_attr() {
        let mut value = 1;
        assert!(!set_attr(&mut value, 1));
        assert!(set_attr(&mut value, 2));
        assert_eq!(value, 2);
    }
}
