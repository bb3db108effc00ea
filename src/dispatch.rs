//! Request dispatch: the router and exception view handling.

pub use cornice_dispatch::*;
