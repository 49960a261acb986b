//! SHA-256 checksums for stored backups.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use vtguard_commons::fs::is_symlink;
use vtguard_commons::{SafetyError, SafetyResult};
use walkdir::WalkDir;

const BUFFER_SIZE: usize = 64 * 1024;
const SYMLINK_MARKER: &[u8] = b"symlink\0";

fn hash_reader(hasher: &mut Sha256, reader: &mut impl Read) -> io::Result<()> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..read]);
    }
}

pub fn file_checksum(path: &Path) -> SafetyResult<String> {
    let mut file = File::open(path).map_err(|err| SafetyError::io("opening", path, err))?;
    let mut hasher = Sha256::new();
    hash_reader(&mut hasher, &mut file).map_err(|err| SafetyError::io("hashing", path, err))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash folded over the sorted relative paths of a tree and the contents of
/// its files, so renames and content edits both change the result.
pub fn directory_checksum(root: &Path) -> SafetyResult<String> {
    let mut hasher = Sha256::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            SafetyError::io("walking", path, io::Error::other(err.to_string()))
        })?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative = relative.to_string_lossy().replace('\\', "/");

        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        if entry.file_type().is_symlink() {
            hash_link(&mut hasher, entry.path())?;
        } else if entry.file_type().is_file() {
            let mut file = File::open(entry.path())
                .map_err(|err| SafetyError::io("opening", entry.path(), err))?;
            hash_reader(&mut hasher, &mut file)
                .map_err(|err| SafetyError::io("hashing", entry.path(), err))?;
        }
        hasher.update([0xffu8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Links hash as their target text, never the data they point at.
fn hash_link(hasher: &mut Sha256, path: &Path) -> SafetyResult<()> {
    let target = fs::read_link(path).map_err(|err| SafetyError::io("reading link", path, err))?;
    hasher.update(SYMLINK_MARKER);
    hasher.update(target.to_string_lossy().as_bytes());
    Ok(())
}

pub fn path_checksum(path: &Path, is_dir: bool) -> SafetyResult<String> {
    if is_symlink(path) {
        let mut hasher = Sha256::new();
        hash_link(&mut hasher, path)?;
        return Ok(format!("{:x}", hasher.finalize()));
    }
    if is_dir {
        directory_checksum(path)
    } else {
        file_checksum(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digest_for_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("abc");
        fs::write(&file, b"abc").unwrap();
        assert_eq!(
            file_checksum(&file).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn directory_checksum_tracks_names_and_content() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/a.txt"), b"one").unwrap();
        let first = directory_checksum(&dir).unwrap();
        assert_eq!(first, directory_checksum(&dir).unwrap());

        fs::write(dir.join("sub/a.txt"), b"two").unwrap();
        let edited = directory_checksum(&dir).unwrap();
        assert_ne!(first, edited);

        fs::rename(dir.join("sub/a.txt"), dir.join("sub/b.txt")).unwrap();
        assert_ne!(edited, directory_checksum(&dir).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn directory_checksum_hashes_links_without_following_them() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir_all(dir.join("sub")).unwrap();
        symlink("sub", dir.join("to_sub")).unwrap();
        symlink("gone", dir.join("dangling")).unwrap();
        let first = directory_checksum(&dir).unwrap();

        fs::remove_file(dir.join("dangling")).unwrap();
        symlink("elsewhere", dir.join("dangling")).unwrap();
        assert_ne!(first, directory_checksum(&dir).unwrap());
    }
}
