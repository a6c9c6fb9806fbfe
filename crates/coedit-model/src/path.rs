//! Structural paths into a document.

use std::fmt;

use crate::PathError;

/// A single step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    /// Property of an object.
    Key(String),
    /// Element of an array.
    Index(usize),
    /// Cell `(row, col)` of an array of arrays.
    Table(usize, usize),
}

impl PathElement {
    /// The array index this element selects at its own depth.
    ///
    /// For a table cell this is the row, which is what array-structural
    /// operations on the outer array shift.
    pub fn array_index(&self) -> Option<usize> {
        match self {
            PathElement::Index(i) => Some(*i),
            PathElement::Table(row, _) => Some(*row),
            PathElement::Key(_) => None,
        }
    }

    /// Returns a copy selecting `index` instead of the current array index.
    /// Keys are returned unchanged.
    pub fn with_array_index(&self, index: usize) -> PathElement {
        match self {
            PathElement::Index(_) => PathElement::Index(index),
            PathElement::Table(_, col) => PathElement::Table(index, *col),
            PathElement::Key(k) => PathElement::Key(k.clone()),
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathElement::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl From<(usize, usize)> for PathElement {
    fn from((row, col): (usize, usize)) -> Self {
        PathElement::Table(row, col)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Key(k) => f.write_str(&escape_key(k)),
            PathElement::Index(i) => write!(f, "{i}"),
            PathElement::Table(row, col) => write!(f, "[{row},{col}]"),
        }
    }
}

/// Escapes a key for display, `~` as `~0` and `/` as `~1`.
pub fn escape_key(key: &str) -> String {
    if !key.contains('/') && !key.contains('~') {
        return key.to_string();
    }
    key.replace('~', "~0").replace('/', "~1")
}

/// Ordered sequence of [`PathElement`]s from the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathElement>);

impl Path {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Path(elements)
    }

    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn get(&self, depth: usize) -> Option<&PathElement> {
        self.0.get(depth)
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.0.iter()
    }

    pub fn push(&mut self, element: impl Into<PathElement>) {
        self.0.push(element.into());
    }

    /// Returns this path extended by one element.
    pub fn child(&self, element: impl Into<PathElement>) -> Path {
        let mut elements = self.0.clone();
        elements.push(element.into());
        Path(elements)
    }

    /// Returns the path of the enclosing container.
    pub fn parent(&self) -> Result<Path, PathError> {
        if self.0.is_empty() {
            return Err(PathError::NoParent);
        }
        Ok(Path(self.0[..self.0.len() - 1].to_vec()))
    }

    /// True if `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// True if `self` is a prefix of, or equal to, `other`.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Returns a copy with the element at `depth` replaced.
    pub fn with_element(&self, depth: usize, element: PathElement) -> Path {
        let mut elements = self.0.clone();
        if let Some(slot) = elements.get_mut(depth) {
            *slot = element;
        }
        Path(elements)
    }

    /// Spells every table cell `(row, col)` as the two indices `row, col`.
    ///
    /// Two paths naming the same node are equal once expanded.
    pub fn expanded(&self) -> Path {
        let mut elements = Vec::with_capacity(self.0.len());
        for element in &self.0 {
            match element {
                PathElement::Table(row, col) => {
                    elements.push(PathElement::Index(*row));
                    elements.push(PathElement::Index(*col));
                }
                other => elements.push(other.clone()),
            }
        }
        Path(elements)
    }

    /// Inverse of [`Path::expanded`]: folds index pairs back into table
    /// cells wherever `shape` has one.
    ///
    /// `self` must be the expansion of a path shaped like `shape`; otherwise
    /// it is returned unchanged.
    pub fn packed_like(&self, shape: &Path) -> Path {
        if self.0.len() != shape.expanded().len() {
            return self.clone();
        }
        let mut elements = Vec::with_capacity(shape.len());
        let mut rest = self.0.iter();
        for element in &shape.0 {
            match (element, rest.next()) {
                (PathElement::Table(..), Some(PathElement::Index(row))) => match rest.next() {
                    Some(PathElement::Index(col)) => elements.push(PathElement::Table(*row, *col)),
                    _ => return self.clone(),
                },
                (PathElement::Table(..), _) | (_, None) => return self.clone(),
                (_, Some(other)) => elements.push(other.clone()),
            }
        }
        Path(elements)
    }

    pub fn into_inner(self) -> Vec<PathElement> {
        self.0
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Path(elements)
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.0 {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

/// Builds a [`Path`] from keys, indices and `(row, col)` cells.
///
/// ```
/// use coedit_model::{path, PathElement};
///
/// let p = path!["items", 2, "title"];
/// assert_eq!(p.get(1), Some(&PathElement::Index(2)));
/// assert!(path![].is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($element:expr),+ $(,)?) => {
        $crate::Path::new(vec![$($crate::PathElement::from($element)),+])
    };
}
