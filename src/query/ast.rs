use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;

use crate::core::error::Result;
use crate::index::IndexReader;
use crate::query::prepared::PreparedBox;
use crate::scoring::{Boost, NO_BOOST, Order, ScoreMergeType};
use crate::search::AttributeProvider;

/// User-defined leaf of the filter tree (term, range, prefix, ...).
///
/// Leaves are the seam to the index layer: `prepare` resolves whatever the
/// leaf matches against `reader` and returns a prepared query whose
/// `execute` yields a sorted posting iterator per segment. Implementations
/// fold `boost` into their own: the effective boost of a prepared leaf is
/// `boost * self.boost()`.
pub trait LeafFilter: fmt::Debug + Send + Sync {
    fn boost(&self) -> Boost {
        NO_BOOST
    }

    fn prepare(
        &self,
        reader: &dyn IndexReader,
        ord: &Order,
        boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox>;

    fn eq_dyn(&self, other: &dyn LeafFilter) -> bool;

    fn hash_dyn(&self, state: &mut dyn Hasher);

    fn clone_dyn(&self) -> Box<dyn LeafFilter>;

    fn as_any(&self) -> &dyn Any;
}

/// A node of the boolean filter tree.
///
/// `And`/`Or` own an ordered sequence of children, `Not` owns at most one,
/// `All` matches every document of a segment, `Empty` matches none, and
/// `Leaf` admits user-defined filters. Equality and hashing are structural
/// over (variant, boost, payload, children order). The planner never
/// mutates a tree; ownership of children is exclusive.
#[derive(Debug)]
pub enum Filter {
    And(And),
    Or(Or),
    Not(Not),
    All(All),
    Empty(Empty),
    Leaf(Box<dyn LeafFilter>),
}

impl Filter {
    /// Wrap a user-defined leaf filter.
    pub fn leaf<L: LeafFilter + 'static>(leaf: L) -> Filter {
        Filter::Leaf(Box::new(leaf))
    }

    pub fn boost(&self) -> Boost {
        match self {
            Filter::And(f) => f.boost,
            Filter::Or(f) => f.boost,
            Filter::Not(f) => f.boost,
            Filter::All(f) => f.boost,
            Filter::Empty(_) => NO_BOOST,
            Filter::Leaf(f) => f.boost(),
        }
    }
}

impl Clone for Filter {
    fn clone(&self) -> Self {
        match self {
            Filter::And(f) => Filter::And(f.clone()),
            Filter::Or(f) => Filter::Or(f.clone()),
            Filter::Not(f) => Filter::Not(f.clone()),
            Filter::All(f) => Filter::All(f.clone()),
            Filter::Empty(f) => Filter::Empty(f.clone()),
            Filter::Leaf(f) => Filter::Leaf(f.clone_dyn()),
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Filter::And(a), Filter::And(b)) => {
                a.boost == b.boost && a.merge_type == b.merge_type && a.filters == b.filters
            }
            (Filter::Or(a), Filter::Or(b)) => {
                a.boost == b.boost
                    && a.min_match_count == b.min_match_count
                    && a.merge_type == b.merge_type
                    && a.filters == b.filters
            }
            (Filter::Not(a), Filter::Not(b)) => a.boost == b.boost && a.filter == b.filter,
            (Filter::All(a), Filter::All(b)) => a.boost == b.boost,
            (Filter::Empty(_), Filter::Empty(_)) => true,
            (Filter::Leaf(a), Filter::Leaf(b)) => a.eq_dyn(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            Filter::And(f) => {
                f.boost.to_bits().hash(state);
                f.filters.hash(state);
            }
            Filter::Or(f) => {
                f.boost.to_bits().hash(state);
                f.min_match_count.hash(state);
                f.filters.hash(state);
            }
            Filter::Not(f) => {
                f.boost.to_bits().hash(state);
                f.filter.hash(state);
            }
            Filter::All(f) => f.boost.to_bits().hash(state),
            Filter::Empty(_) => {}
            Filter::Leaf(f) => f.hash_dyn(state),
        }
    }
}

macro_rules! impl_from_filter {
    ($($variant:ident),+) => {$(
        impl From<$variant> for Filter {
            fn from(node: $variant) -> Filter {
                Filter::$variant(node)
            }
        }
    )+};
}

impl_from_filter!(And, Or, Not, All, Empty);

/// Conjunction node: every child must match.
#[derive(Debug, Clone)]
pub struct And {
    pub filters: Vec<Filter>,
    pub boost: Boost,
    pub merge_type: ScoreMergeType,
}

impl And {
    pub fn new() -> Self {
        And {
            filters: Vec::new(),
            boost: NO_BOOST,
            merge_type: ScoreMergeType::Aggregate,
        }
    }

    /// Append a child node.
    pub fn add(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with_boost(mut self, boost: Boost) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_merge_type(mut self, merge_type: ScoreMergeType) -> Self {
        self.merge_type = merge_type;
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for And {
    fn default() -> Self {
        Self::new()
    }
}

/// Disjunction node: at least `min_match_count` children must match.
///
/// `min_match_count` defaults to 1; an explicit 0 means "match every
/// document in the segment".
#[derive(Debug, Clone)]
pub struct Or {
    pub filters: Vec<Filter>,
    pub boost: Boost,
    pub min_match_count: usize,
    pub merge_type: ScoreMergeType,
}

impl Or {
    pub fn new() -> Self {
        Or {
            filters: Vec::new(),
            boost: NO_BOOST,
            min_match_count: 1,
            merge_type: ScoreMergeType::Aggregate,
        }
    }

    /// Append a child node.
    pub fn add(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with_boost(mut self, boost: Boost) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_min_match_count(mut self, count: usize) -> Self {
        self.min_match_count = count;
        self
    }

    pub fn with_merge_type(mut self, merge_type: ScoreMergeType) -> Self {
        self.merge_type = merge_type;
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for Or {
    fn default() -> Self {
        Self::new()
    }
}

/// Negation node: owns exactly one child.
#[derive(Debug, Clone)]
pub struct Not {
    pub filter: Option<Box<Filter>>,
    pub boost: Boost,
}

impl Not {
    pub fn new() -> Self {
        Not {
            filter: None,
            boost: NO_BOOST,
        }
    }

    /// Set the negated child.
    pub fn set(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.filter = Some(Box::new(filter.into()));
        self
    }

    pub fn with(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(Box::new(filter.into()));
        self
    }

    pub fn with_boost(mut self, boost: Boost) -> Self {
        self.boost = boost;
        self
    }
}

impl Default for Not {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches every document of a segment.
#[derive(Debug, Clone, Copy)]
pub struct All {
    pub boost: Boost,
}

impl All {
    pub fn new() -> Self {
        All { boost: NO_BOOST }
    }

    pub fn with_boost(boost: Boost) -> Self {
        All { boost }
    }
}

impl Default for All {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches no document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use crate::query::docset::DocSetFilter;

    fn hash_of(filter: &Filter) -> u64 {
        let mut hasher = DefaultHasher::new();
        filter.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_structural_equality() {
        let a: Filter = Or::new()
            .with(Filter::leaf(DocSetFilter::new(vec![1, 2])))
            .with(Not::new().with(All::new()))
            .with_boost(2.0)
            .into();
        let b: Filter = Or::new()
            .with(Filter::leaf(DocSetFilter::new(vec![1, 2])))
            .with(Not::new().with(All::new()))
            .with_boost(2.0)
            .into();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_inequality_on_boost_and_children_order() {
        let base = || {
            Or::new()
                .with(Filter::leaf(DocSetFilter::new(vec![1])))
                .with(Filter::leaf(DocSetFilter::new(vec![2])))
        };
        let a: Filter = base().into();
        let boosted: Filter = base().with_boost(3.0).into();
        assert_ne!(a, boosted);

        let swapped: Filter = Or::new()
            .with(Filter::leaf(DocSetFilter::new(vec![2])))
            .with(Filter::leaf(DocSetFilter::new(vec![1])))
            .into();
        assert_ne!(a, swapped);
    }

    #[test]
    fn test_variant_inequality() {
        let and: Filter = And::new().into();
        let or: Filter = Or::new().into();
        assert_ne!(and, or);
        assert_ne!(Filter::from(All::new()), Filter::from(Empty));
    }

    #[test]
    fn test_min_match_participates_in_equality() {
        let a: Filter = Or::new().with(All::new()).into();
        let b: Filter = Or::new().with(All::new()).with_min_match_count(0).into();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clone_is_deep() {
        let original: Filter = And::new()
            .with(Filter::leaf(DocSetFilter::new(vec![5, 6])))
            .into();
        let copy = original.clone();
        assert_eq!(original, copy);
    }
}
