/// Part names and the path arithmetic relationships need.
///
/// A part name is the zip member name of a part, a POSIX-style path without a
/// leading slash (e.g. `ppt/slides/slide3.xml`). Relationship targets are
/// stored relative to the directory of their source part and resolved here.
use crate::ooxml::opc::error::{OpcError, Result};

/// Source name used for package-level relationships (`_rels/.rels`).
pub const PACKAGE_SOURCE: &str = "";

/// Zip member name of the content-type registry.
pub const CONTENT_TYPES_MEMBER: &str = "[Content_Types].xml";

/// A validated part name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartName {
    name: String,
}

impl PartName {
    /// Create a part name, accepting an optional leading slash.
    ///
    /// # Errors
    /// Fails for empty names, names ending in `/` and backslash separators.
    pub fn new<S: AsRef<str>>(name: S) -> Result<Self> {
        let raw = name.as_ref();
        let trimmed = raw.strip_prefix('/').unwrap_or(raw);
        if trimmed.is_empty() || trimmed.ends_with('/') || trimmed.contains('\\') {
            return Err(OpcError::InvalidPartName(raw.to_string()));
        }
        Ok(Self {
            name: trimmed.to_string(),
        })
    }

    /// Resolve a relationship target against the directory of its source.
    ///
    /// Targets beginning with `/` are package-absolute; `..` and `.` segments
    /// are normalized away.
    pub fn resolve(base_dir: &str, target: &str) -> Result<Self> {
        let joined = if let Some(absolute) = target.strip_prefix('/') {
            absolute.to_string()
        } else if base_dir.is_empty() {
            target.to_string()
        } else {
            format!("{}/{}", base_dir, target)
        };
        Self::new(normalize_path(&joined))
    }

    /// Directory portion, `""` for parts at the package root.
    ///
    /// For example, `ppt/slides` for `ppt/slides/slide1.xml`.
    pub fn base_dir(&self) -> &str {
        base_dir_of(&self.name)
    }

    /// Filename portion, e.g. `slide1.xml`.
    pub fn filename(&self) -> &str {
        match memchr::memrchr(b'/', self.name.as_bytes()) {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Extension without the leading period, e.g. `xml`.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Numeric suffix of tuple part names, or `None` for singleton parts.
    ///
    /// For example, returns 21 for `ppt/slides/slide21.xml` and `None` for
    /// `ppt/presentation.xml`.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        atoi_simd::parse::<u32>(&stem.as_bytes()[stem.len() - digits..]).ok()
    }

    /// Relative reference from `base_dir` to this part.
    ///
    /// For example, `../slideLayouts/slideLayout1.xml` from `ppt/slides`.
    pub fn relative_ref(&self, base_dir: &str) -> String {
        if base_dir.is_empty() {
            return self.name.clone();
        }

        let from_parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.name.split('/').collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = String::new();
        for _ in common..from_parts.len() {
            result.push_str("../");
        }
        result.push_str(&to_parts[common..].join("/"));
        result
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.name
    }
}

/// Directory portion of a part name or relationship source.
pub fn base_dir_of(name: &str) -> &str {
    match memchr::memrchr(b'/', name.as_bytes()) {
        Some(pos) => &name[..pos],
        None => "",
    }
}

/// Zip member holding the relationships of `source`.
///
/// `_rels/.rels` for the package itself, `ppt/_rels/presentation.xml.rels`
/// for `ppt/presentation.xml`.
pub fn rels_member_for(source: &str) -> String {
    if source == PACKAGE_SOURCE {
        return "_rels/.rels".to_string();
    }
    let dir = base_dir_of(source);
    let filename = &source[if dir.is_empty() { 0 } else { dir.len() + 1 }..];
    if dir.is_empty() {
        format!("_rels/{}.rels", filename)
    } else {
        format!("{}/_rels/{}.rels", dir, filename)
    }
}

/// Inverse of [`rels_member_for`]: the source a `.rels` member belongs to.
///
/// Returns `None` for members that are not relationship parts.
pub fn source_for_rels_member(member: &str) -> Option<String> {
    let stripped = member.strip_suffix(".rels")?;
    if stripped == "_rels/" {
        return Some(PACKAGE_SOURCE.to_string());
    }
    let dir = base_dir_of(stripped);
    let filename = &stripped[if dir.is_empty() { 0 } else { dir.len() + 1 }..];
    let parent = if dir == "_rels" {
        ""
    } else {
        dir.strip_suffix("/_rels")?
    };
    if filename.is_empty() {
        return None;
    }
    Some(if parent.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", parent, filename)
    })
}

/// Resolve `.` and `..` segments in a slash-separated path.
fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

impl std::fmt::Display for PartName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for PartName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
