use std::sync::LazyLock;

use regex::Regex;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,254}$").expect("valid name regex")
});

/// Plain file names: a single path component, no hidden files, no `.`/`..`.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Lowercase hex digests long enough to provide `shard_bytes` directory levels.
pub fn is_valid_digest(digest: &str, shard_bytes: usize) -> bool {
    digest.len() >= shard_bytes * 2
        && !digest.bytes().any(|b| b.is_ascii_uppercase())
        && hex::decode(digest).is_ok()
}
