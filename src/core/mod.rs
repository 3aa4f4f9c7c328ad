pub mod classifier;
pub mod composer;
pub mod extract;
pub mod facts;
pub mod gedcom;
pub mod pipeline;
pub mod predicate;
pub mod summary;
pub mod theme;
