//! # Wirelab Core Library
//!
//! This crate is the core of `wirelab`, an interactive grid-based digital
//! logic circuit editor and simulator. It contains everything except the
//! pixels: the value model, net resolution, the discrete-event scheduler,
//! the concurrency guard shared by the editor and simulation loops, and
//! the persistence layer. Rendering frontends consume the library; the
//! bundled binary (`main.rs`) drives it headlessly from the command line.
//!
//! ## Crate Structure
//!
//! - **`logic`**: the four-valued `LogicValue`/`BitVector` types, the
//!   single driver merge rule, and conservative gate helpers.
//! - **`geometry`**: grid points, quarter-turn rotations and validated
//!   axis-aligned wire segments.
//! - **`topology`**: node instances, live pin buffers and the flat wire
//!   segment arena; all structural edits validate here.
//! - **`net`**: the net resolver, turning segments plus pin positions into
//!   connected electrical nets with aggregated values.
//! - **`behavior`**: the per-node-type evaluator contract (`NodeBehavior`).
//! - **`registry`**: the explicit type-key registry node construction goes
//!   through; populated once at startup, no global singleton.
//! - **`nodes`**: built-in node types (gates, tri-state buffer, source,
//!   probe, adder).
//! - **`scheduler`**: the discrete-event tick loop with the oscillation
//!   guard.
//! - **`workbench`**: the aggregate core, its invertible edit operations,
//!   the `SharedWorkbench` concurrency guard and the background runner.
//! - **`session`**: JSON circuit documents (save/load/round-trip).
//! - **`history`**: undo/redo as data-carrying command objects.
//! - **`editor`**: per-frame gesture state machine for multi-frame
//!   interactions.
//! - **`config`**: figment-based TOML + environment configuration.
//! - **`trace`**: tracing subscriber setup.
//! - **`error`**: the `CoreError` taxonomy.

pub mod behavior;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logic;
pub mod net;
pub mod nodes;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod topology;
pub mod trace;
pub mod workbench;
