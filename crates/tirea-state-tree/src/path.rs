//! Paths into the state tree.
//!
//! A path is an ordered list of segments. Each segment is either an object key
//! or an array index. Paths are valid even when the values they traverse do not
//! exist yet; reading through a missing container simply yields
//! [`Value::Undefined`](crate::Value::Undefined).
//!
//! A key that spells an array index (`"0"`, `"12"`, but not `"01"` or `"+1"`)
//! and the index itself address the same slot, so paths always hold the
//! index form. Two paths to one slot therefore compare and hash equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step into the tree.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key: `{"key": value}`
    Key(String),
    /// Array index: `[index]`
    Index(usize),
}

impl Seg {
    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Resolve this segment as an array position.
    ///
    /// Keys that spell a decimal number address the same slot as the
    /// corresponding index.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(k) => parse_index(k),
            Seg::Index(i) => Some(*i),
        }
    }

    /// The canonical form of this segment: index-like keys become indices.
    pub fn normalize(self) -> Seg {
        match self {
            Seg::Key(k) => match parse_index(&k) {
                Some(i) => Seg::Index(i),
                None => Seg::Key(k),
            },
            index => index,
        }
    }

    /// Resolve this segment as an object key.
    pub fn to_key(&self) -> String {
        match self {
            Seg::Key(k) => k.clone(),
            Seg::Index(i) => i.to_string(),
        }
    }
}

/// `Some` only for the exact decimal spelling of an index.
fn parse_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, ".{}", k),
            Seg::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s).normalize()
    }
}

impl From<&String> for Seg {
    fn from(s: &String) -> Self {
        Seg::from(s.clone())
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::from(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// Negative numbers cannot index an array and become plain keys.
impl From<i32> for Seg {
    fn from(i: i32) -> Self {
        match usize::try_from(i) {
            Ok(index) => Seg::Index(index),
            Err(_) => Seg::Key(i.to_string()),
        }
    }
}

/// A location in the state tree.
///
/// # Examples
///
/// ```
/// use tirea_state_tree::{path, Path};
///
/// let p = Path::root().key("users").index(0).key("name");
/// assert_eq!(p, path!("users", 0, "name"));
/// assert_eq!(p.to_string(), "$.users[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Seg>")]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path, addressing the root value.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        segments.into_iter().collect()
    }

    /// Append a key segment (builder).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment (builder).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path.
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg.normalize());
    }

    /// A new path one level deeper than this one.
    #[inline]
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(seg.into().normalize());
        Path(segments)
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// True for the root path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// The path without its last segment, or `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    /// Check if this path is a prefix of `other`.
    ///
    /// Every path is a prefix of itself, and the root is a prefix of
    /// everything.
    ///
    /// ```
    /// use tirea_state_tree::path;
    ///
    /// assert!(path!("user").is_prefix_of(&path!("user", "name")));
    /// assert!(!path!("user", "name").is_prefix_of(&path!("user")));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// True when one of the two paths contains the other.
    ///
    /// A write at one of them can change the value seen at the other.
    #[inline]
    pub fn is_related_to(&self, other: &Path) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().map(Seg::normalize).collect())
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segments: Vec<Seg>) -> Self {
        Path::from_segments(segments)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a [`Path`] from a sequence of segments.
///
/// String expressions become key segments, non-negative integers become index
/// segments.
///
/// ```
/// use tirea_state_tree::{path, Seg};
///
/// let p = path!("items", 0, "name");
/// assert_eq!(p[1], Seg::Index(0));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}
