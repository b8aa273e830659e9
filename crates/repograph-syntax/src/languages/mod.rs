//! Grammar set registry for the supported language tags.

mod go;
mod java;
mod javascript;
mod python;
mod rust;
mod typescript;

use crate::grammar::GrammarSet;

/// Every supported grammar set.
pub fn all() -> Vec<GrammarSet> {
    vec![
        typescript::grammar(),
        javascript::grammar(),
        python::grammar(),
        rust::grammar(),
        go::grammar(),
        java::grammar(),
    ]
}

/// Grammar for a language tag, if supported.
pub fn grammar_for(language: &str) -> Option<GrammarSet> {
    all().into_iter().find(|g| g.language == language)
}

/// Language tag for a file extension, if supported.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    all()
        .into_iter()
        .find(|g| g.extensions.contains(&ext))
        .map(|g| g.language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_supported_tags() {
        for tag in ["typescript", "javascript", "python", "rust", "go", "java"] {
            assert!(grammar_for(tag).is_some(), "missing grammar for {tag}");
        }
        assert!(grammar_for("cobol").is_none());
    }

    #[test]
    fn extension_resolution() {
        assert_eq!(language_for_extension("ts"), Some("typescript"));
        assert_eq!(language_for_extension("tsx"), Some("typescript"));
        assert_eq!(language_for_extension("jsx"), Some("javascript"));
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("rs"), Some("rust"));
        assert_eq!(language_for_extension("go"), Some("go"));
        assert_eq!(language_for_extension("java"), Some("java"));
        assert_eq!(language_for_extension("xyz"), None);
    }
}
