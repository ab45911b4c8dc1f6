//! A persistent, insertion-ordered map keyed by a primitive (string or
//! integer), with structural sharing across versions.
//!
//! Every mutation (`set`, `replace`, `unset`, `empty`) returns a new map
//! sharing unchanged structure with its ancestor rather than mutating it in
//! place. Three modes trade off how much history a lineage keeps:
//!
//! - [`Mode::Single`] — one mutation per map, then the predecessor is
//!   gated off for further mutation (reads still work).
//! - [`Mode::Multiway`] — arbitrary branching; every fork is independently
//!   mutable and isolated from its siblings.
//! - [`Mode::Lightweight`] — one mutation per map, after which the
//!   predecessor becomes entirely unusable, trading history for a
//!   cheaper, overwrite-in-place heap index.
//!
//! See `DESIGN.md` in the crate root for the grounding behind each module.

mod change;
mod error;
mod heap;
mod item;
mod iter;
mod json;
mod lazy;
mod linked;
mod map;
mod node;

pub use crate::change::Change;
pub use crate::error::{Error, Result};
pub use crate::item::{Item, Key};
pub use crate::json::{from_json, to_json, JsonError};
pub use crate::lazy::LazyMap;
pub use crate::map::{MapConfig, Mode, OrderedMap};
pub use crate::node::Version;
