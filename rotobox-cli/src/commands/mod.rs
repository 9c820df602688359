//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of one subcommand.

/// `compare`: probe two videos and report compression deltas.
pub mod compare;
/// `render`: draw the rectangle overlay onto a video.
pub mod render;
/// `run`: render, then compare the result against its source.
pub mod run;
