//! Message padding for traffic analysis resistance.
//!
//! Every outbound message can carry a random printable padding string so
//! identical messages do not produce identical payload sizes on the wire.
//! The padding length is drawn uniformly from `[0, max)`; a maximum of
//! zero disables padding entirely.

use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random printable padding string with a length drawn
/// uniformly from `[0, max)`. Returns an empty string when `max` is zero.
pub fn random_padding(max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(0..max);
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_disables_padding() {
        assert!(random_padding(0).is_empty());
    }

    #[test]
    fn test_length_stays_below_max() {
        for _ in 0..500 {
            assert!(random_padding(64).len() < 64);
        }
    }

    #[test]
    fn test_charset_is_printable() {
        let padding = random_padding(4096);
        assert!(padding.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_lengths_vary() {
        let mut lengths = std::collections::HashSet::new();
        for _ in 0..200 {
            lengths.insert(random_padding(1024).len());
        }
        // Uniform draws over [0, 1024) should not collapse to one value
        assert!(lengths.len() > 1);
    }
}
