//! Error channel: located diagnostics and the empty-solid policy.
//!
//! Every point and event carries a `Loc` stamped by the front end; fatal
//! diagnostics report the primary location and, where a conflicting sibling
//! exists, a secondary one.

use thiserror::Error;

/// Opaque source-location tag.
///
/// The front end maps these back to tokens/AST nodes; the core only carries
/// them through. `Loc::NONE` marks synthesized geometry (e.g. intersection
/// points inherit the location of an original endpoint instead).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Loc(pub u32);

impl Loc {
    pub const NONE: Loc = Loc(u32::MAX);
}

impl Default for Loc {
    fn default() -> Self {
        Loc::NONE
    }
}

/// How to treat recoverable policy violations (e.g. empty-solid difference).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Policy {
    #[default]
    Ignore,
    Warn,
    Fail,
}

#[derive(Error, Debug)]
pub enum Error {
    /// Nonsensical start-up configuration; fatal before any geometry runs.
    #[error("configuration error: {msg}")]
    Config { msg: String },

    /// Broken input or violated internal invariant, with the offending
    /// object's location (and the conflicting sibling's, when known).
    #[error("topology error: {msg}")]
    Topology {
        loc: Loc,
        loc2: Option<Loc>,
        msg: String,
    },

    /// Policy violation promoted to an error by `Policy::Fail`.
    #[error("empty solid: {msg}")]
    EmptySolid { loc: Loc, msg: String },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config { msg: msg.into() }
    }

    pub fn topology(loc: Loc, msg: impl Into<String>) -> Self {
        Error::Topology {
            loc,
            loc2: None,
            msg: msg.into(),
        }
    }

    pub fn topology2(loc: Loc, loc2: Loc, msg: impl Into<String>) -> Self {
        Error::Topology {
            loc,
            loc2: Some(loc2),
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
