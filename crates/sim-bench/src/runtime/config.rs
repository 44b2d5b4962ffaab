use clap::Parser;
use std::path::PathBuf;

/// Replays a peripheral scenario against a simulated pin bank and prints one
/// JSON outcome per line.
#[derive(Parser, Debug, Clone)]
#[command(name = "sim-bench")]
#[command(version)]
#[command(about = "Simulated LED and servo bench")]
pub struct RuntimeConfig {
    /// Scenario file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// After the scenario steps, read further steps as JSON lines from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Skip the scenario's own steps (only build the rig)
    #[arg(long)]
    pub no_steps: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Append a JSONL audit trail to this file
    #[arg(long, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,

    /// Write a Prometheus text snapshot here when the run ends
    #[arg(long, value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,

    /// Do not print the trailing summary line
    #[arg(long)]
    pub no_summary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let config = RuntimeConfig::try_parse_from([
            "sim-bench",
            "--scenario",
            "panel.toml",
            "--stdin",
            "--json-logs",
            "--log-file",
            "bench.log",
            "--audit-log",
            "audit.jsonl",
            "--metrics-out",
            "metrics.prom",
            "--no-summary",
        ])
        .unwrap();

        assert_eq!(config.scenario, PathBuf::from("panel.toml"));
        assert!(config.stdin);
        assert!(!config.no_steps);
        assert!(config.json_logs);
        assert_eq!(config.log_file, Some(PathBuf::from("bench.log")));
        assert_eq!(config.audit_log, Some(PathBuf::from("audit.jsonl")));
        assert_eq!(config.metrics_out, Some(PathBuf::from("metrics.prom")));
        assert!(config.no_summary);
    }

    #[test]
    fn scenario_is_required() {
        assert!(RuntimeConfig::try_parse_from(["sim-bench"]).is_err());
    }

    #[test]
    fn short_scenario_flag() {
        let config = RuntimeConfig::try_parse_from(["sim-bench", "-s", "a.toml"]).unwrap();
        assert_eq!(config.scenario, PathBuf::from("a.toml"));
        assert!(config.audit_log.is_none());
    }
}
