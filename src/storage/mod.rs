//! Persistent storage for the enrichment pipeline.
//!
//! The database side of the three flows: which buyers need briefs, what
//! award history backs their prompts, and where finished briefs land.

pub mod briefs;
pub mod database;
pub mod history;

pub use briefs::{BriefRow, BRIEF_CATEGORY};
pub use database::{Buyer, Database, DatabaseError};
pub use history::{AwardHistory, AwardStats, RecentContract, RenewalPattern, TopSupplier};
