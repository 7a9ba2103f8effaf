//! Agent text protocol types for the `--agent` headless mode.
//!
//! External programs drive a monitoring session with newline-delimited JSON
//! on stdin/stdout. The I/O loop lives in `crates/app/src/agent_mode.rs`;
//! the schema lives here so it can be tested without the binary. Cells are
//! carried as hexadecimal strings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::controller::RerouteRequest;
use crate::geo::Coordinate;
use crate::grid_cost::{CongestionLevel, RerouteCheckResult};
use crate::relevance::RelevanceResult;
use crate::session::SessionStatus;
use crate::spatial_index::Cell;
use crate::traffic_event::{EventId, EventReport, TrafficEvent};

// ---------------------------------------------------------------------------
// Commands (stdin → session)
// ---------------------------------------------------------------------------

/// One line of stdin. The `cmd` field is the discriminator.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Replace the monitored route; endpoints default to the path ends.
    SetRoute {
        path: Vec<Coordinate>,
        #[serde(default)]
        origin: Option<Coordinate>,
        #[serde(default)]
        destination: Option<Coordinate>,
    },
    ReportEvent {
        report: EventReport,
    },
    RemoveEvent {
        id: EventId,
    },
    /// Level is derived from the speed ratio when omitted.
    UpdateCongestion {
        cell: Cell,
        #[serde(default)]
        level: Option<CongestionLevel>,
        speed_ratio: f64,
    },
    /// Advance the session clock by `seconds`.
    Step {
        seconds: u64,
    },
    CheckReroute,
    /// Check a candidate route; with `adopt`, switch to it when it is clear.
    ValidateReroute {
        path: Vec<Coordinate>,
        #[serde(default)]
        adopt: bool,
    },
    CellsToAvoid,
    StartSimulation,
    StopSimulation,
    StartMonitoring,
    StopMonitoring,
    Status,
    Quit,
}

// ---------------------------------------------------------------------------
// Responses (session → stdout)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub protocol_version: u32,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Ready,
    Ok,
    EventReported {
        event: TrafficEvent,
        relevance: RelevanceResult,
        tracked: bool,
        check: RerouteCheckResult,
    },
    RerouteCheck {
        check: RerouteCheckResult,
    },
    Validation {
        valid: bool,
        adopted: bool,
    },
    CellsToAvoid {
        cells: BTreeSet<Cell>,
    },
    /// Clock advanced; lists the reroute requests raised meanwhile.
    StepComplete {
        elapsed_secs: f64,
        reroute_requests: Vec<RerouteRequest>,
    },
    Status {
        status: SessionStatus,
    },
    Error {
        message: String,
    },
    Goodbye,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bump when the command/response schema changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound on one `step`, in seconds of session time.
pub const MAX_STEP_SECS: u64 = 24 * 60 * 60;

pub fn make_response(payload: ResponsePayload) -> AgentResponse {
    AgentResponse {
        protocol_version: PROTOCOL_VERSION,
        payload,
    }
}

pub fn error_response(message: impl Into<String>) -> AgentResponse {
    make_response(ResponsePayload::Error {
        message: message.into(),
    })
}
