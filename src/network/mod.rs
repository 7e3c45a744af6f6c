//! Derived-metric computation: snapshot derivation, history bucketing, and
//! priority-fee recommendations.

pub mod derive;
pub mod fees;
pub mod history;
