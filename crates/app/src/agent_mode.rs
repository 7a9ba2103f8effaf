//! Headless `--agent` mode: a blocking synchronous loop that reads JSON
//! commands from stdin and writes JSON responses to stdout.
//!
//! ## Protocol
//!
//! Each line of stdin is a JSON object with a `"cmd"` discriminator.
//! Each line of stdout is a JSON response with `"protocol_version"` and
//! `"type"` fields. See [`reroute::agent_protocol`] for the full schema.
//! Session time only advances on `step`, one second per frame.

use std::io::{BufRead, Write};

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use reroute::agent_protocol::{
    error_response, make_response, AgentCommand, AgentResponse, ResponsePayload, MAX_STEP_SECS,
    PROTOCOL_VERSION,
};
use reroute::controller::RerouteRequested;
use reroute::session;

/// Reroute requests raised while stepping, read through one cursor.
struct StepRequests {
    cursor: EventCursor<RerouteRequested>,
}

impl StepRequests {
    fn skip_pending(&mut self, world: &World) {
        let skipped = self
            .cursor
            .read(world.resource::<Events<RerouteRequested>>())
            .count();
        if skipped > 0 {
            debug!("{} reroute request(s) raised outside a step", skipped);
        }
    }
}

pub fn run_agent_mode(app: &mut App) {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    // Send the "ready" message so the external program knows we are live.
    emit(&mut stdout, &make_response(ResponsePayload::Ready));
    info!("agent mode v{} ready, waiting for commands on stdin", PROTOCOL_VERSION);

    let mut requests = StepRequests {
        cursor: EventCursor::default(),
    };

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("stdin read error: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let cmd: AgentCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                emit(&mut stdout, &error_response(format!("Parse error: {e}")));
                continue;
            }
        };

        let response = process_command(cmd, app, &mut requests);
        let is_goodbye = matches!(response.payload, ResponsePayload::Goodbye);
        emit(&mut stdout, &response);

        if is_goodbye {
            break;
        }
    }

    info!("agent mode shutting down");
}

fn emit(out: &mut impl Write, response: &AgentResponse) {
    let line = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize response: {}", e);
            format!(
                r#"{{"protocol_version":{PROTOCOL_VERSION},"type":"error","message":"serialization failed"}}"#
            )
        }
    };
    if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
        warn!("stdout closed");
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

fn process_command(
    cmd: AgentCommand,
    app: &mut App,
    requests: &mut StepRequests,
) -> AgentResponse {
    let world = app.world_mut();
    match cmd {
        AgentCommand::SetRoute {
            path,
            origin,
            destination,
        } => match session::set_route(world, &path, origin, destination) {
            Ok(()) => make_response(ResponsePayload::Ok),
            Err(e) => error_response(format!("route rejected: {e}")),
        },

        AgentCommand::ReportEvent { report } => match session::report_event(world, report) {
            Ok(outcome) => make_response(ResponsePayload::EventReported {
                event: outcome.event,
                relevance: outcome.relevance,
                tracked: outcome.tracked,
                check: outcome.evaluation.check,
            }),
            Err(e) => error_response(format!("event rejected: {e}")),
        },

        AgentCommand::RemoveEvent { id } => {
            if session::remove_event(world, id) {
                make_response(ResponsePayload::Ok)
            } else {
                error_response(format!("unknown event {id}"))
            }
        }

        AgentCommand::UpdateCongestion {
            cell,
            level,
            speed_ratio,
        } => {
            session::update_congestion(world, cell, level, speed_ratio);
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::Step { seconds } => {
            // Requests raised by earlier commands were already answered.
            requests.skip_pending(world);
            let frames = seconds.min(MAX_STEP_SECS);
            let mut raised = Vec::new();
            for _ in 0..frames {
                app.update();
                let events = app.world().resource::<Events<RerouteRequested>>();
                raised.extend(requests.cursor.read(events).map(|r| r.0.clone()));
            }
            make_response(ResponsePayload::StepComplete {
                elapsed_secs: session::now(app.world()).as_secs_f64(),
                reroute_requests: raised,
            })
        }

        AgentCommand::CheckReroute => make_response(ResponsePayload::RerouteCheck {
            check: session::check_reroute(world),
        }),

        AgentCommand::ValidateReroute { path, adopt } => {
            let result = if adopt {
                session::adopt_reroute(world, &path).map(|adopted| (adopted, adopted))
            } else {
                session::validate_reroute(world, &path).map(|valid| (valid, false))
            };
            match result {
                Ok((valid, adopted)) => {
                    make_response(ResponsePayload::Validation { valid, adopted })
                }
                Err(e) => error_response(format!("validation failed: {e}")),
            }
        }

        AgentCommand::CellsToAvoid => match session::cells_to_avoid(world) {
            Ok(cells) => make_response(ResponsePayload::CellsToAvoid { cells }),
            Err(e) => error_response(format!("cells to avoid failed: {e}")),
        },

        AgentCommand::StartSimulation => {
            session::start_simulation(world);
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::StopSimulation => {
            session::stop_simulation(world);
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::StartMonitoring => {
            session::start_monitoring(world);
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::StopMonitoring => {
            session::stop_monitoring(world);
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::Status => make_response(ResponsePayload::Status {
            status: session::status(world),
        }),

        AgentCommand::Quit => make_response(ResponsePayload::Goodbye),
    }
}
