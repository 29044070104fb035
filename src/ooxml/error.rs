/// Error types for presentation operations.
use crate::ooxml::opc::error::OpcError;
use thiserror::Error;

/// Result type for presentation operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for presentation operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Malformed archive or XML, a missing mandatory member, or a package
    /// that fails validation on save
    #[error("Corrupt package: {0}")]
    CorruptPackage(String),

    /// The package has no usable presentation part
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("{}", layout_not_found_message(.name, .available, .suggestion.as_deref()))]
    LayoutNotFound {
        name: String,
        available: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("Slide {requested} not found. Presentation has {total} slides (1-{total})")]
    SlideNotFound { requested: usize, total: usize },

    /// `reorder_slides` input is not a permutation of the slide numbers
    #[error("Invalid slide permutation: {0}")]
    InvalidPermutation(String),

    #[error("Placeholder '{name}' not found on slide {slide}. Available: {}", .available.join(", "))]
    PlaceholderNotFound {
        name: String,
        slide: usize,
        available: Vec<String>,
    },

    #[error("Shape {0} not found")]
    ShapeNotFound(u32),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(OpcError),
}

fn layout_not_found_message(name: &str, available: &[String], suggestion: Option<&str>) -> String {
    let mut msg = format!(
        "Layout '{}' not found. Available layouts: {}",
        name,
        available.join(", ")
    );
    if let Some(suggestion) = suggestion {
        msg.push_str(&format!(". Did you mean '{}'?", suggestion));
    }
    msg
}

impl From<OpcError> for OoxmlError {
    fn from(err: OpcError) -> Self {
        if err.is_corruption() {
            OoxmlError::CorruptPackage(err.to_string())
        } else {
            OoxmlError::Opc(err)
        }
    }
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

impl From<std::fmt::Error> for OoxmlError {
    fn from(err: std::fmt::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

/// Build a [`OoxmlError::LayoutNotFound`] with a did-you-mean suggestion.
pub fn layout_not_found(name: &str, available: Vec<String>) -> OoxmlError {
    let suggestion = find_similar(name, &available, 0.6);
    OoxmlError::LayoutNotFound {
        name: name.to_string(),
        available,
        suggestion,
    }
}

/// Best match for `query` among `candidates`, if any scores at least `threshold`.
///
/// Similarity is the Jaccard index over character bigrams of the lowercased
/// strings.
pub fn find_similar(query: &str, candidates: &[String], threshold: f64) -> Option<String> {
    let query_grams = bigrams(query);
    candidates
        .iter()
        .map(|c| (c, jaccard(&query_grams, &bigrams(c))))
        .filter(|(_, score)| *score >= threshold)
        .fold(None::<(&String, f64)>, |best, (c, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((c, score)),
        })
        .map(|(c, _)| c.clone())
}

fn bigrams(s: &str) -> std::collections::HashSet<(char, char)> {
    let chars: Vec<char> = s.to_lowercase().chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

fn jaccard(
    a: &std::collections::HashSet<(char, char)>,
    b: &std::collections::HashSet<(char, char)>,
) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}
