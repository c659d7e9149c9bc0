//! Item transformation.
//!
//! The actual pixel-level work happens elsewhere; the pipeline only needs a
//! deterministic mapping from a source reference to a derived one.

/// Derive the output reference for a source image reference.
///
/// Pure and total: same input, same output, no failure mode.
pub fn compress_ref(input_ref: &str) -> String {
    format!("{}?compressed=50", input_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_ref_appends_marker() {
        assert_eq!(
            compress_ref("http://a.com/x.png"),
            "http://a.com/x.png?compressed=50"
        );
    }

    #[test]
    fn test_compress_ref_is_deterministic() {
        let a = compress_ref("https://cdn.example.com/photo.jpeg");
        let b = compress_ref("https://cdn.example.com/photo.jpeg");
        assert_eq!(a, b);
    }
}
