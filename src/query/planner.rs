use std::borrow::Cow;

use crate::core::error::Result;
use crate::index::IndexReader;
use crate::query::ast::{All, And, Empty, Filter, Not, Or};
use crate::query::prepared::{AllQuery, BooleanKind, BooleanQuery, EmptyQuery, PreparedBox};
use crate::scoring::{Boost, NO_BOOST, Order, ScoreMergeType};
use crate::search::AttributeProvider;

// Collapse a chain of Not nodes to the innermost non-Not child.
// Odd chain length means the child is effectively negated.
fn optimize_not(node: &Not) -> Option<(&Filter, bool)> {
    let mut negated = true;
    let mut inner = node.filter.as_deref();
    while let Some(Filter::Not(not)) = inner {
        negated = !negated;
        inner = not.filter.as_deref();
    }
    inner.map(|filter| (filter, negated))
}

pub(crate) enum Grouped<'a> {
    /// A negated `All` was found: nothing can match, whatever else the
    /// group contains.
    Annihilated,
    Parts {
        incl: Vec<Cow<'a, Filter>>,
        excl: Vec<Cow<'a, Filter>>,
    },
}

/// Partition the children of an And/Or into inclusion and exclusion sets.
///
/// Double negations collapse; a childless `Not` is dropped. A direct
/// `Empty` child is re-appended last to the inclusions so the And planner
/// can spot it cheaply (and the Or planner can discard it). Under an Or
/// parent a negated child additionally pushes an unboosted `All` into the
/// inclusions: the negation matches every document but must not score.
pub(crate) fn group_filters(filters: &[Filter], is_or: bool) -> Grouped<'_> {
    let mut incl = Vec::with_capacity(filters.len() / 2 + 1);
    let mut excl = Vec::new();
    let mut empty_child: Option<&Filter> = None;

    for filter in filters {
        match filter {
            Filter::Empty(_) => empty_child = Some(filter),
            Filter::Not(not) => {
                let Some((inner, negated)) = optimize_not(not) else {
                    continue;
                };
                if negated {
                    if matches!(inner, Filter::All(_)) {
                        return Grouped::Annihilated;
                    }
                    excl.push(Cow::Borrowed(inner));
                    if is_or {
                        incl.push(Cow::Owned(Filter::All(All::with_boost(0.0))));
                    }
                } else {
                    incl.push(Cow::Borrowed(inner));
                }
            }
            other => incl.push(Cow::Borrowed(other)),
        }
    }

    if let Some(empty) = empty_child {
        incl.push(Cow::Borrowed(empty));
    }

    Grouped::Parts { incl, excl }
}

impl Filter {
    /// Compile this filter against a reader into a prepared query.
    ///
    /// `boost` is the boost accumulated from enclosing nodes; pass
    /// [`NO_BOOST`] at the root. The tree itself is never mutated.
    pub fn prepare(
        &self,
        reader: &dyn IndexReader,
        ord: &Order,
        boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        match self {
            Filter::And(f) => f.prepare(reader, ord, boost, ctx),
            Filter::Or(f) => f.prepare(reader, ord, boost, ctx),
            Filter::Not(f) => f.prepare(reader, ord, boost, ctx),
            Filter::All(f) => Ok(Box::new(AllQuery::new(boost * f.boost))),
            Filter::Empty(_) => Ok(Box::new(EmptyQuery)),
            Filter::Leaf(f) => f.prepare(reader, ord, boost, ctx),
        }
    }
}

fn prepare_children(
    filters: &[Cow<'_, Filter>],
    reader: &dyn IndexReader,
    ord: &Order,
    boost: Boost,
    ctx: Option<&dyn AttributeProvider>,
) -> Result<Vec<PreparedBox>> {
    filters
        .iter()
        .map(|filter| filter.prepare(reader, ord, boost, ctx))
        .collect()
}

fn prepare_boolean(
    kind: BooleanKind,
    incl: &[Cow<'_, Filter>],
    excl: &[Cow<'_, Filter>],
    reader: &dyn IndexReader,
    ord: &Order,
    boost: Boost,
    ctx: Option<&dyn AttributeProvider>,
    merge: ScoreMergeType,
) -> Result<PreparedBox> {
    let incl = prepare_children(incl, reader, ord, boost, ctx)?;
    // excluded children are set filters: no order, no boost
    let excl = prepare_children(excl, reader, Order::unordered(), NO_BOOST, ctx)?;
    Ok(Box::new(BooleanQuery::new(kind, incl, excl, boost, merge)))
}

impl And {
    pub fn prepare(
        &self,
        reader: &dyn IndexReader,
        ord: &Order,
        boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        let (mut incl, excl) = match group_filters(&self.filters, false) {
            Grouped::Annihilated => return Ok(Box::new(EmptyQuery)),
            Grouped::Parts { incl, excl } => (incl, excl),
        };

        // negation-only query: everything except the excluded
        if incl.is_empty() && !excl.is_empty() {
            incl.push(Cow::Owned(Filter::All(All::new())));
        }

        self.prepare_grouped(incl, excl, reader, ord, boost, ctx)
    }

    fn prepare_grouped(
        &self,
        mut incl: Vec<Cow<'_, Filter>>,
        excl: Vec<Cow<'_, Filter>>,
        reader: &dyn IndexReader,
        ord: &Order,
        mut boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        // an Empty inclusion makes the whole conjunction empty; grouping
        // parked it at the back
        if incl.is_empty() || matches!(incl.last(), Some(last) if matches!(&**last, Filter::Empty(_))) {
            return Ok(Box::new(EmptyQuery));
        }

        let mut all_boost: Boost = 0.0;
        let mut all_count = 0usize;
        for filter in &incl {
            if let Filter::All(all) = filter.as_ref() {
                all_count += 1;
                all_boost += all.boost;
            }
        }

        if all_count != 0 {
            let non_all_count = incl.len() - all_count;
            incl.retain(|filter| !matches!(filter.as_ref(), Filter::All(_)));

            if non_all_count == 1 {
                // Fold the All boosts into the remaining filter by
                // adjusting the external boost so that executing it alone
                // yields boost * self.boost * (all_boost + left_boost).
                let left_boost = incl[0].boost();
                if self.boost != 0.0 && left_boost != 0.0 && !ord.is_empty() {
                    boost = (boost * self.boost * all_boost + boost * self.boost * left_boost)
                        / (left_boost * self.boost);
                } else {
                    boost = 0.0;
                }
            } else {
                // one synthetic All carries the boost of all removed ones
                incl.push(Cow::Owned(Filter::All(All::with_boost(all_boost))));
            }
        }

        boost *= self.boost;

        if incl.len() == 1 && excl.is_empty() {
            return incl[0].prepare(reader, ord, boost, ctx);
        }

        prepare_boolean(
            BooleanKind::And,
            &incl,
            &excl,
            reader,
            ord,
            boost,
            ctx,
            self.merge_type,
        )
    }
}

impl Or {
    pub fn prepare(
        &self,
        reader: &dyn IndexReader,
        ord: &Order,
        boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        // an explicit zero minimum matches everything, whatever the
        // children turn out to be
        if self.min_match_count == 0 {
            return Ok(Box::new(AllQuery::new(boost * self.boost)));
        }

        let (mut incl, excl) = match group_filters(&self.filters, true) {
            Grouped::Annihilated => return Ok(Box::new(EmptyQuery)),
            Grouped::Parts { incl, excl } => (incl, excl),
        };

        if incl.is_empty() && !excl.is_empty() {
            incl.push(Cow::Owned(Filter::All(All::new())));
        }

        self.prepare_grouped(incl, excl, reader, ord, boost, ctx)
    }

    fn prepare_grouped(
        &self,
        mut incl: Vec<Cow<'_, Filter>>,
        excl: Vec<Cow<'_, Filter>>,
        reader: &dyn IndexReader,
        ord: &Order,
        mut boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        boost *= self.boost;

        if matches!(incl.last(), Some(last) if matches!(&**last, Filter::Empty(_))) {
            incl.pop();
        }
        if incl.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let mut all_boost: Boost = 0.0;
        let mut all_count = 0usize;
        let mut all_index = None;
        for (i, filter) in incl.iter().enumerate() {
            if let Filter::All(all) = filter.as_ref() {
                all_count += 1;
                all_boost += all.boost;
                all_index = Some(i);
            }
        }

        let mut optimized_match_count = 0usize;
        if let Some(all_index) = all_index {
            if ord.is_empty() && incl.len() > 1 && self.min_match_count <= all_count {
                // all is absorbing: without scoring, one All satisfies the
                // whole minimum and every other child is redundant
                let kept = incl.swap_remove(all_index);
                incl.clear();
                incl.push(kept);
            } else {
                // unlike And, the synthetic All always stays an inclusion
                incl.retain(|filter| !matches!(filter.as_ref(), Filter::All(_)));
                incl.push(Cow::Owned(Filter::All(All::with_boost(all_boost))));
            }
            optimized_match_count = all_count - 1;
        }

        let adjusted_min_match = if optimized_match_count < self.min_match_count {
            self.min_match_count - optimized_match_count
        } else {
            1
        };

        if adjusted_min_match > incl.len() {
            return Ok(Box::new(EmptyQuery));
        }

        if incl.len() == 1 && excl.is_empty() {
            return incl[0].prepare(reader, ord, boost, ctx);
        }

        let kind = if adjusted_min_match == incl.len() {
            BooleanKind::And
        } else if adjusted_min_match == 1 {
            BooleanKind::Or
        } else {
            BooleanKind::MinMatch(adjusted_min_match)
        };

        prepare_boolean(kind, &incl, &excl, reader, ord, boost, ctx, self.merge_type)
    }
}

impl Not {
    pub fn prepare(
        &self,
        reader: &dyn IndexReader,
        ord: &Order,
        boost: Boost,
        ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        let Some((inner, negated)) = optimize_not(self) else {
            return Ok(Box::new(EmptyQuery));
        };

        let boost = boost * self.boost;

        if negated {
            let incl = [Cow::Owned(Filter::All(All::new()))];
            let excl = [Cow::Borrowed(inner)];
            return prepare_boolean(
                BooleanKind::And,
                &incl,
                &excl,
                reader,
                ord,
                boost,
                ctx,
                ScoreMergeType::Aggregate,
            );
        }

        // the negation chain cancelled out
        inner.prepare(reader, ord, boost, ctx)
    }
}
