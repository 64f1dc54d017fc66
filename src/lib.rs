//! Live derived views over observable lists
//!
//! A *source* is any `OuterViewPort<dyn ListView<T>>`, e.g. the port of a
//! [`VecBuffer`](buffer::vec::VecBuffer). Each *projection* observes a source
//! and keeps its own derived list in sync, incrementally, from the
//! `ListDiff` messages the source emits:
//!
//! * [`map_list`](projection::map_list): one converted element per input,
//!   mapped once and remembered in an identity lookup,
//! * [`filter_list`](projection::filter_list): the inputs passing a predicate,
//!   in source order,
//! * [`sort_filter_list`](projection::sort_filter_list): the inputs passing a
//!   predicate, ordered by a key.
//!
//! Elements that can change on their own (see [`ItemNotify`](view::item::ItemNotify))
//! are re-tested by the filtering views whenever they signal a change.
//!
//! Every derived list is again exposed as a port, so projections compose.
//!
//!# Examples
//!
//! ```
//! use r3vi_collections::buffer::vec::*;
//!
//! let mut buffer = VecBuffer::<i32>::new();
//! buffer.push(3).unwrap();
//!
//! let mapped = buffer.get_port().map_list(|x| x + 10);
//! let filtered = mapped.port().filter_list(|x| *x > 10);
//!
//! assert_eq!(filtered.to_vec(), vec![13]);
//!
//! buffer.push(5).unwrap();   // maps to 15
//! buffer.push(-9).unwrap();  // maps to 1, is eliminated by filter
//! buffer.push(1).unwrap();   // maps to 11
//!
//! assert_eq!(filtered.to_vec(), vec![13, 15, 11]);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod projection;
pub mod view;

pub use {
    config::{DuplicatePolicy, ProjectionConfig},
    error::{Result, ViewError},
};
