pub mod core;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;

/*
┌─────────────────────────────────────────────────────────────────────────┐
│                       BRAMBLE QUERY PIPELINE                            │
└─────────────────────────────────────────────────────────────────────────┘

  Filter tree (query::ast)          And / Or / Not / All / Empty / Leaf
        │
        │  Filter::prepare(reader, order, boost, ctx)
        ▼
  Prepared query (query::prepared)  boolean plans, All, Empty, leaf plans
        │                           boost folded, All/Empty rewritten,
        │                           min_match adjusted (query::planner)
        │
        │  PreparedFilter::execute(segment, order, ctx)   [per segment]
        ▼
  Doc iterator tree (search)        conjunction / disjunctions /
        │                           min-match / exclusion over leaf
        │                           posting iterators
        │
        │  next() / seek(target)
        ▼
  Sorted doc-id stream              value(), cost(), score(), match_count()
                                    scores merged per the order bundle
                                    (scoring: Sort buckets, AGGREGATE/MAX)
*/

pub use crate::core::types::DocId;
pub use crate::query::ast::{All, And, Empty, Filter, LeafFilter, Not, Or};
pub use crate::query::prepared::{PreparedBox, PreparedFilter};
pub use crate::scoring::{Boost, NO_BOOST, Order, ScoreMergeType, Sort};
pub use crate::search::{DocIterator, DocIteratorBox};
