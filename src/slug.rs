/// Lower-cases `title`, collapses every run of characters outside `[a-z0-9]` into a single
/// `-` and trims hyphens from both ends.
///
/// The result may be empty (e.g. for an all-punctuation title); callers treat that as invalid.
pub fn derive_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_titles() {
        assert_eq!(derive_slug("Hello World!"), "hello-world");
        assert_eq!(derive_slug("My First Post"), "my-first-post");
        assert_eq!(derive_slug("My First Post!!"), "my-first-post");
        assert_eq!(derive_slug("Rust 2024: what's new?"), "rust-2024-what-s-new");
    }

    #[test]
    fn test_trims_and_collapses() {
        assert_eq!(derive_slug("  --Leading and trailing--  "), "leading-and-trailing");
        assert_eq!(derive_slug("a   ...   b"), "a-b");
    }

    #[test]
    fn test_non_ascii_is_a_separator() {
        assert_eq!(derive_slug("Café au lait"), "caf-au-lait");
        assert_eq!(derive_slug("日本語"), "");
    }

    #[test]
    fn test_all_punctuation_is_empty() {
        assert_eq!(derive_slug("!!!"), "");
        assert_eq!(derive_slug(""), "");
    }

    #[test]
    fn test_output_shape() {
        let titles = [
            "Hello, World",
            "--x--",
            "ÀÉÎ õ ü",
            "Tabs\tand\nnewlines",
            "UPPER lower 123",
            "___",
            "a-b-c",
        ];

        for title in titles {
            let slug = derive_slug(title);
            assert!(slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            assert!(!slug.starts_with('-'));
            assert!(!slug.ends_with('-'));
            assert!(!slug.contains("--"));
            assert_eq!(derive_slug(&slug), slug);
        }
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        assert_eq!(derive_slug("Hello World"), derive_slug("hello...WORLD"));
        assert_eq!(derive_slug("a b"), derive_slug("A_-_B"));
    }
}
