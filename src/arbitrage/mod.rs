//! Arbitrage core: margin math, runner matching, detection strategies,
//! and the pre-notification gate.

pub mod detector;
pub mod gate;
pub mod margin;
pub mod matcher;

pub use detector::{detect_best_back, detect_per_outcome, Opportunity};
pub use gate::{GateDecision, OpportunityGate, ProcessedMarker};
pub use margin::{grey_man_stake, implied_probability, lay_stake, liability, profit_margin};
