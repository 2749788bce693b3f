//! Utility functions for common operations.
//!
//! # Examples
//!
//! ```
//! use newswire::util::slugify;
//!
//! assert_eq!(slugify("Breaking News: Markets Rally!"), "breaking-news-markets-rally");
//! ```

mod slug;

pub use slug::slugify;
