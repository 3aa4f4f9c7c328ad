pub mod date;
pub mod event;
pub mod fact;
pub mod family;
pub mod graph;
pub mod individual;
pub mod opaque;
pub mod place;
pub mod warning;
