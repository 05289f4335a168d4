//! Comparison helpers shared by the view differ

/// Elementwise equality: different length means different.
pub fn arrays_equal<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    arrays_equal(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_by_content_not_reference() {
        let a = vec!["solana:mainnet".to_string(), "solana:devnet".to_string()];
        let b = vec!["solana:mainnet".to_string(), "solana:devnet".to_string()];
        assert!(arrays_equal(&a, &b));
    }

    #[test]
    fn length_mismatch_is_different() {
        assert!(!arrays_equal(&[1, 2, 3], &[1, 2]));
        assert!(!arrays_equal(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn reorder_is_different() {
        assert!(!arrays_equal(&[1, 2], &[2, 1]));
    }

    #[test]
    fn bytes() {
        assert!(bytes_equal(b"abc", b"abc"));
        assert!(!bytes_equal(b"abc", b"abd"));
        assert!(bytes_equal(b"", b""));
    }
}
