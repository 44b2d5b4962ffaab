use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use clap::Parser;
use sim_io::{Rig, RunSummary, Scenario, ScenarioError, ScenarioLoader, Step};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, warn};

/// Exit status when the scenario cannot be loaded or assembled.
const EXIT_SCENARIO: u8 = 2;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("cannot open audit log {}: {source}", .path.display())]
    Audit { path: PathBuf, source: io::Error },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn run_from_args() -> ExitCode {
    run(RuntimeConfig::parse())
}

pub fn run(config: RuntimeConfig) -> ExitCode {
    let _log_guard = init_tracing(config.json_logs, config.log_file.as_deref());
    telemetry::init();

    let status = match replay(&config) {
        Ok(summary) => {
            info!(
                outcomes = summary.outcomes,
                accepted = summary.accepted,
                rejected = summary.rejected,
                pin_writes = summary.pin_writes,
                "Replay complete"
            );
            ExitCode::SUCCESS
        }
        Err(AppError::Scenario(e)) => {
            error!(error = %e, path = %config.scenario.display(), "Scenario rejected");
            ExitCode::from(EXIT_SCENARIO)
        }
        Err(e) => {
            error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    };

    if let Some(path) = &config.metrics_out {
        if let Err(e) = telemetry::write_snapshot(path) {
            warn!(error = %e, path = %path.display(), "Failed to write metrics snapshot");
        }
    }

    status
}

fn replay(config: &RuntimeConfig) -> Result<RunSummary, AppError> {
    let scenario = Scenario::load(&config.scenario)?;
    info!(
        path = %config.scenario.display(),
        name = %scenario.name,
        steps = scenario.steps.len(),
        "Scenario loaded"
    );
    let mut rig = Rig::build(&scenario)?;

    let audit = config
        .audit_log
        .as_deref()
        .map(|path| {
            AuditLogger::new(path).map_err(|source| AppError::Audit {
                path: path.to_path_buf(),
                source,
            })
        })
        .transpose()?;
    if let Some(path) = &config.audit_log {
        info!(path = %path.display(), "Audit logging enabled");
    }

    audit_event(
        audit.as_ref(),
        AuditEventType::RunStart,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "scenario": scenario.name,
            "path": config.scenario.display().to_string(),
            "devices": rig.devices().map(|(id, _)| id).collect::<Vec<_>>(),
            "powered": rig.supply().is_on(),
        }),
    );

    match replay_steps(config, &scenario, &mut rig, audit.as_ref()) {
        Ok(summary) => {
            audit_event(
                audit.as_ref(),
                AuditEventType::RunEnd,
                serde_json::to_value(&summary)?,
            );
            Ok(summary)
        }
        Err(e) => {
            audit_event(
                audit.as_ref(),
                AuditEventType::RunAborted,
                serde_json::json!({
                    "error": e.to_string(),
                    "summary": rig.summary(),
                }),
            );
            Err(e)
        }
    }
}

fn replay_steps(
    config: &RuntimeConfig,
    scenario: &Scenario,
    rig: &mut Rig,
    audit: Option<&AuditLogger>,
) -> Result<RunSummary, AppError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if config.no_steps {
        info!("Scenario steps skipped");
    } else {
        for step in &scenario.steps {
            emit(rig, step, &mut out, audit)?;
        }
    }

    if config.stdin {
        info!("Reading steps from stdin");
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match Step::parse_line(&line) {
                Some(step) => emit(rig, &step, &mut out, audit)?,
                None => {
                    warn!(line = %line, "Ignoring malformed step");
                    audit_event(
                        audit,
                        AuditEventType::MalformedStep,
                        serde_json::json!({ "line": line }),
                    );
                }
            }
        }
    }

    let summary = rig.summary();
    if !config.no_summary {
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    }
    out.flush()?;
    Ok(summary)
}

/// Applies one step and prints each outcome as a JSON line.
fn emit(
    rig: &mut Rig,
    step: &Step,
    out: &mut impl Write,
    audit: Option<&AuditLogger>,
) -> Result<(), AppError> {
    for outcome in rig.apply(step) {
        writeln!(out, "{}", outcome.to_json_line()?)?;
        let event = if outcome.status.is_accepted() {
            AuditEventType::StepApplied
        } else {
            AuditEventType::StepRejected
        };
        audit_event(audit, event, serde_json::to_value(&outcome)?);
    }
    Ok(())
}

fn audit_event(audit: Option<&AuditLogger>, event: AuditEventType, details: serde_json::Value) {
    if let Some(logger) = audit {
        if let Err(e) = logger.log_event(event, details) {
            warn!(error = %e, ?event, "Failed to write audit entry");
        }
    }
}
