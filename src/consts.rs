//! Project-wide constants.

use std::time::Duration;

/// Default FHIR endpoint when the caller supplies no environment context.
pub const DEFAULT_FHIR_SERVER: &str = "https://fhir.example.com";

/// Fallback notification recipient when the caller names no care team.
pub const DEFAULT_PRIMARY_PHYSICIAN: &str = "care.team@example.com";

/// Fixed interval between instance status polls. Low enough that
/// sub-second workflows feel immediate, high enough to bound poll volume.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default deadline for a workflow instance to reach a terminal status.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Process definition id for the clinical risk routing graph.
pub const RISK_ROUTING_PROCESS_ID: &str = "clinical-risk-routing";
