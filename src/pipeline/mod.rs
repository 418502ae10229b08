//! Pipeline entry points for the alert feed.
//!
//! - `run_poller`: load the backlog, then follow the channel
//! - `run_cycle`: one fetch → apply pass
//! - `run_validate`: check configuration and seed data
//! - `run_status`: JSON projection of the stored states
//! - `render_tree`: indented dump of the hierarchy

pub mod poll;
pub mod regions;
pub mod status;
pub mod validate;

pub use poll::{CycleStats, cancel_on_ctrl_c, open_synchronizer, run_cycle, run_poller};
pub use regions::{load_hierarchy, render_tree};
pub use status::{StatusProjection, load_projection, run_status};
pub use validate::run_validate;
