//! SHA-1 checksums used to detect edits to already-applied migrations.

use sha1::{Digest, Sha1};

/// Hex-encoded SHA-1 over the concatenation of `parts`
pub fn checksum(parts: &[&str]) -> String {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Checksum of a single step file, keyed on both its name and raw contents
pub fn file_checksum(filename: &str, contents: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(filename.as_bytes());
    hasher.update(contents.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Roll per-file checksums up into one direction checksum.
///
/// An empty list maps to the empty string rather than the hash of nothing.
pub fn rollup<'a, I>(checksums: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined: String = checksums.into_iter().collect();
    if joined.is_empty() {
        joined
    } else {
        checksum(&[&joined])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(
            checksum(&["abc"]),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_checksum_concatenates_parts() {
        assert_eq!(checksum(&["foo", "bar"]), checksum(&["foobar"]));
        assert_eq!(file_checksum("foo", "bar"), checksum(&["foobar"]));
    }

    #[test]
    fn test_rollup_empty_is_empty_string() {
        assert_eq!(rollup(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_rollup_known_value() {
        let sums = [
            file_checksum("foo", "foo"),
            file_checksum("bar", "bar"),
            file_checksum("baz", "baz"),
        ];
        let rolled = rollup(sums.iter().map(String::as_str));
        assert_eq!(rolled, "7ed6e5bab93528e8e557056327f660cfc751f833");
        assert_eq!(rolled, rollup(sums.iter().map(String::as_str)));
    }
}
