//! Binding frames and frame sets.
//!
//! A [`Frame`] is one consistent assignment of values to a rule's variables.
//! A [`FrameSet`] is an ordered sequence of alternatives, like the rows of a
//! join result. Order is preserved end to end: it decides the order in which
//! a rule's `then` actions are dispatched.

use std::fmt;
use std::sync::Arc;

use concord_foundation::{Error, SortedMap, Result, Value};

// =============================================================================
// Variables
// =============================================================================

/// A rule variable. Has no value outside a frame.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(Arc<str>);

impl Var {
    /// Creates a variable.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the variable name (without the `?` sigil).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Declares several variables at once.
///
/// ```
/// use concord_engine::vars;
/// let [request, user] = vars(["request", "user"]);
/// assert_eq!(user.name(), "user");
/// # let _ = request;
/// ```
#[must_use]
pub fn vars<const N: usize>(names: [&str; N]) -> [Var; N] {
    names.map(Var::new)
}

// =============================================================================
// Frame
// =============================================================================

/// An immutable mapping from variables to values.
///
/// Invariant: a variable has at most one value. Extending with a different
/// value for a bound variable fails instead of overwriting.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    bindings: SortedMap<Var, Value>,
}

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value bound to a variable.
    #[must_use]
    pub fn get(&self, var: &Var) -> Option<&Value> {
        self.bindings.get(var)
    }

    /// Returns true if the variable is bound.
    #[must_use]
    pub fn is_bound(&self, var: &Var) -> bool {
        self.bindings.contains_key(var)
    }

    /// Returns the number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates bindings in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.bindings.iter()
    }

    /// Binds `var` to `value`, or checks agreement if already bound.
    ///
    /// Returns `None` on disagreement. This is the matcher's primitive:
    /// disagreement simply discards the candidate frame.
    #[must_use]
    pub fn unify(&self, var: &Var, value: &Value) -> Option<Self> {
        match self.bindings.get(var) {
            Some(existing) if existing == value => Some(self.clone()),
            Some(_) => None,
            None => Some(Self {
                bindings: self.bindings.insert(var.clone(), value.clone()),
            }),
        }
    }

    /// Binds `var` to `value`.
    ///
    /// # Errors
    /// Returns a binding conflict if `var` is already bound to a different value.
    pub fn extend(&self, var: &Var, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.unify(var, &value).ok_or_else(|| {
            let existing = self.bindings.get(var).cloned().unwrap_or(Value::Nil);
            Error::binding_conflict(var.name(), existing, value)
        })
    }

    /// Combines two frames.
    ///
    /// # Errors
    /// Returns a binding conflict if a shared variable disagrees.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        other
            .iter()
            .try_fold(self.clone(), |frame, (var, value)| frame.extend(var, value.clone()))
    }

    /// Bindings as `(name, value)` pairs, for tracing.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(var, value)| (var.name().to_string(), value.clone()))
            .collect()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Frame Set
// =============================================================================

/// An ordered sequence of alternative frames.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Creates an empty frame set ("does not apply").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame set holding one frame.
    #[must_use]
    pub fn single(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if there are no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the first frame.
    #[must_use]
    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    /// Iterates frames in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Appends a frame.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Appends every frame of `other`, keeping order.
    pub fn append(&mut self, other: Self) {
        self.frames.extend(other.frames);
    }

    /// Keeps the frames satisfying `predicate`, in order.
    #[must_use]
    pub fn filter(self, mut predicate: impl FnMut(&Frame) -> bool) -> Self {
        Self {
            frames: self.frames.into_iter().filter(|f| predicate(f)).collect(),
        }
    }

    /// Replaces each frame with zero, one, or many frames, in order.
    #[must_use]
    pub fn flat_map<I>(self, mut f: impl FnMut(Frame) -> I) -> Self
    where
        I: IntoIterator<Item = Frame>,
    {
        Self {
            frames: self.frames.into_iter().flat_map(|frame| f(frame)).collect(),
        }
    }

    /// Maps each frame to exactly one frame.
    #[must_use]
    pub fn map(self, f: impl FnMut(Frame) -> Frame) -> Self {
        Self {
            frames: self.frames.into_iter().map(f).collect(),
        }
    }
}

impl fmt::Debug for FrameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl From<Vec<Frame>> for FrameSet {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FromIterator<Frame> for FrameSet {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl Extend<Frame> for FrameSet {
    fn extend<I: IntoIterator<Item = Frame>>(&mut self, iter: I) {
        self.frames.extend(iter);
    }
}

impl IntoIterator for FrameSet {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
