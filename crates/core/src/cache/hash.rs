//! URL-addressed cache key generation.
//!
//! Keys are deliberately short: a 32-bit rolling hash rendered in base 36.
//! Two URLs that hash alike share a slot and the later write wins; the
//! stored `originalUrl` is not compared on read.

/// Namespace prefix for every key the thumbnail cache owns.
pub const CACHE_PREFIX: &str = "thumb_cache_";

/// Compute the store key for a source URL.
pub fn compute_cache_key(url: &str) -> String {
    format!("{CACHE_PREFIX}{}", to_base36(rolling_hash(url).unsigned_abs()))
}

/// `h = h * 31 + c` over UTF-16 code units with 32-bit wrapping.
fn rolling_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit)))
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether a store key belongs to the thumbnail cache namespace.
pub fn is_cache_key(key: &str) -> bool {
    key.starts_with(CACHE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let a = compute_cache_key("https://i.ibb.co/abc/cat.png");
        let b = compute_cache_key("https://i.ibb.co/abc/cat.png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(compute_cache_key(""), "thumb_cache_0");
        assert_eq!(compute_cache_key("a"), "thumb_cache_2p");
        assert_eq!(compute_cache_key("ab"), "thumb_cache_2e9");
    }

    #[test]
    fn test_hash_wraps_on_long_urls() {
        let url = format!("https://tadaup.jp/{}.png", "x".repeat(500));
        let key = compute_cache_key(&url);
        assert!(is_cache_key(&key));
        assert!(key.len() <= CACHE_PREFIX.len() + 7);
    }

    #[test]
    fn test_distinct_urls_usually_differ() {
        assert_ne!(
            compute_cache_key("https://postimg.cc/abc123"),
            compute_cache_key("https://postimg.cc/abc124")
        );
    }

    #[test]
    fn test_known_collision_is_not_resolved() {
        // "Aa" and "BB" hash alike under a multiply-by-31 rolling hash.
        assert_eq!(compute_cache_key("Aa"), compute_cache_key("BB"));
    }

    #[test]
    fn test_namespace() {
        assert!(is_cache_key("thumb_cache_abc"));
        assert!(!is_cache_key("settings_theme"));
    }
}
