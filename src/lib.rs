//! Package implement an ordered index using [red-black tree][wiki-rbtree].
//!
//! [RbTree] is a classic, parent-linked, red-black tree holding a single
//! orderable key type. Nodes live in an arena and are addressed by index,
//! missing children and the root's parent point to a reserved `NIL` index
//! that is black by definition.
//!
//! - Insertion with duplicates, equal keys are placed to the right.
//! - Exact lookup, minimum and maximum, via [NodeRef] handles.
//! - Deletion by handle, handles stay valid until their node is erased.
//! - In-order export into a caller supplied, bounded buffer.
//! - Invariant validation, with statistics on the tree shape.
//! - No Durability guarantee.
//! - Not thread safe, mutation needs exclusive access.
//!
//! Constructing a new [RbTree] instance and CRUD operations:
//!
//! ```
//! use rbix::{Color, RbTree};
//!
//! let mut index: RbTree<u64> = RbTree::new();
//! assert_eq!(index.len(), 0);
//! assert_eq!(index.is_empty(), true);
//!
//! for key in [10, 20, 30].iter() {
//!     index.insert(*key).unwrap();
//! }
//! assert_eq!(index.len(), 3);
//!
//! let root = index.root().unwrap();
//! assert_eq!(index.key(root), Some(&20));
//! assert_eq!(index.color(root), Some(Color::Black));
//!
//! let node = index.find(&10).unwrap();
//! assert_eq!(index.erase(node).unwrap(), 10);
//! assert_eq!(index.find(&10), None);
//!
//! let mut keys = [0_u64; 8];
//! let n = index.export(&mut keys);
//! assert_eq!(&keys[..n], &[20, 30]);
//! ```
//!
//! [wiki-rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree

use std::{error, fmt, result};

// Short form to compose Error values.
//
// Here are few possible ways:
//
// ```ignore
// use crate::Error;
// err_at!(Fatal, msg: format!("bad argument"));
// ```
//
// ```ignore
// use crate::Error;
// err_at!(AllocFailed, vec.try_reserve(1));
// ```
//
// ```ignore
// use crate::Error;
// err_at!(AllocFailed, vec.try_reserve(n), "for {} nodes", n);
// ```
//
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

mod arena;
mod node;
mod rbtree;

pub use node::{Color, NodeRef};
pub use rbtree::{RbTree, Stats};

/// Error variants that are returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location.
pub enum Error {
    /// Tree invariant is broken, reported by [RbTree::validate].
    Fatal(String, String),
    /// Handle is stale, or it was minted by another tree.
    InvalidHandle(String, String),
    /// Arena could not grow to hold a new node.
    AllocFailed(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            InvalidHandle(p, msg) => write!(f, "{} InvalidHandle: {}", p, msg),
            AllocFailed(p, msg) => write!(f, "{} AllocFailed: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;
