// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search vector maintenance
//!
//! - [`VectorExpressionBuilder`]: the SQL expression computing a vector
//! - [`TriggerGenerator`]: PL/pgSQL triggers keeping a vector current inside
//!   the writing transaction
//! - [`IndexMaintainer`]: column/index provisioning and recomputation

pub mod expression;
pub mod maintainer;
pub mod triggers;

pub use expression::{VectorExpressionBuilder, NEW_ROW};
pub use maintainer::{FailedStatement, IndexMaintainer, Provisioning};
pub use triggers::{MaintenanceTrigger, TriggerGenerator};
