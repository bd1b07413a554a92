use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

/// Only the head of a file takes part in its content hash.
pub const HASHED_PREFIX_LENGTH: u64 = 10 * 1024 * 1024;

const CHUNK_LENGTH: usize = 1024 * 1024;

/// Content hash of the first [`HASHED_PREFIX_LENGTH`] bytes, as 16 hex digits.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = File::open(path)?.take(HASHED_PREFIX_LENGTH);
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0; CHUNK_LENGTH];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.write(&buffer[..bytes_read]);
    }

    Ok(format!("{:016x}", hasher.finish()))
}

pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    format!("{:016x}", hasher.finish())
}
