//! View callables, the view deriver, multi-views and renderers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cornice::views::{StaticView, ViewCallable};
//!
//! let assets: ViewCallable = StaticView::new("./static").into_callable();
//! ```

pub use cornice_views::*;
