//! Path-addressed mutation of store state.
//!
//! Every operation is a pure function from an old [`StateValue`] to a new
//! one. Containers on the way from the root to the mutation point are copied,
//! everything else is shared with the old state.
//!
//! [`StateValue`]: crate::value::StateValue

mod operations;

pub use operations::{apply_mutation, Mutation};
