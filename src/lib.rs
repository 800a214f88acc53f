//! histcmp - Statistical comparison of binned histograms
//!
//! This library compares two histograms from different production runs. A
//! cheap precondition gate settles trivial pairs (empty, incomparable,
//! identical, single-bin, too sparse) and everything else goes through a
//! battery of goodness-of-fit tests, each isolated in its own worker with a
//! time budget.

pub mod cli;
pub mod collection;
pub mod comparison;
pub mod histogram;
pub mod metrics;
