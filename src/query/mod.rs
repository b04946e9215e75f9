pub mod collection;
pub mod cursor;
pub mod filter;
pub mod sort;

pub use collection::{
    ApplyOutcome, CollectionQuery, FetchTicket, Listener, ListenerId, QueryEvent, QueryState,
};
pub use cursor::{PageCursor, PageDirection};
pub use filter::{
    FilterPredicateSet, FilterValue, Operand, Predicate, PredicateOp, StringValues,
    WirePredicate, encode_predicates,
};
pub use sort::{SortDirection, SortSpec};
