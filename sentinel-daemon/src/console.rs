//! Operator console -- line commands on stdin.
//!
//! Stands in for the dashboard controls. Each line is parsed into a
//! [`Command`], executed against the monitor and answered on stdout.
//!
//! ```text
//! start | stop | burst [n] | analyze <id> | clear | stats | list [n]
//! show <id> | health | help | quit
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use sentinel_core::pipeline::Pipeline;
use sentinel_core::types::{EnrichmentState, RecordId};
use sentinel_log_stream::{
    AnalysisOutcome, BufferedRecord, MAX_BURST, StreamMonitor, ThreatClassifier,
};

use crate::report::format_status;

/// Records pushed by `burst` without an argument.
pub const DEFAULT_BURST: usize = 5;

/// Records shown by `list` without an argument.
pub const DEFAULT_LIST: usize = 10;

const HELP: &str = "commands: start | stop | burst [n] | analyze <id> | clear | stats | \
list [n] | show <id> | health | help | quit";

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Burst(usize),
    Analyze(RecordId),
    Clear,
    Stats,
    List(usize),
    Show(RecordId),
    Health,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for '{verb}'"));
    }

    let count = |default: usize| -> Result<usize, String> {
        match arg {
            None => Ok(default),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=MAX_BURST).contains(&n) => Ok(n),
                _ => Err(format!("expected a number from 1 to {MAX_BURST}, got '{raw}'")),
            },
        }
    };
    let id = || -> Result<RecordId, String> {
        arg.map(RecordId::new)
            .ok_or_else(|| format!("'{verb}' needs a record id"))
    };

    let command = match verb.to_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "burst" => Command::Burst(count(DEFAULT_BURST)?),
        "analyze" => Command::Analyze(id()?),
        "clear" => Command::Clear,
        "stats" => Command::Stats,
        "list" => Command::List(count(DEFAULT_LIST)?),
        "show" => Command::Show(id()?),
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Execute a command against the monitor.
pub async fn execute<C: ThreatClassifier>(monitor: &StreamMonitor<C>, command: Command) -> Reply {
    let text = match command {
        Command::Start => match monitor.start_monitoring().await {
            Ok(true) => "monitoring started".to_owned(),
            Ok(false) => "monitoring already running".to_owned(),
            Err(e) => format!("error: {e}"),
        },
        Command::Stop => {
            if monitor.stop_monitoring().await {
                "monitoring stopped".to_owned()
            } else {
                "monitoring already stopped".to_owned()
            }
        }
        Command::Burst(n) => match monitor.burst(n).await {
            Ok(ids) => format!("pushed {n} records, {} still buffered", ids.len()),
            Err(e) => format!("error: {e}"),
        },
        Command::Analyze(id) => match monitor.request_analysis(&id).await {
            Ok(AnalysisOutcome::Dispatched) => format!("analysis requested for {id}"),
            Ok(AnalysisOutcome::Rejected(reason)) => format!("{id}: {reason}"),
            Err(e) => format!("error: {e}"),
        },
        Command::Clear => match monitor.clear_all().await {
            Ok(removed) => format!("cleared {removed} records"),
            Err(e) => format!("error: {e}"),
        },
        Command::Stats => format_status(monitor.is_monitoring(), &monitor.stats().await),
        Command::List(n) => {
            let snapshot = monitor.snapshot().await;
            if snapshot.is_empty() {
                "no records".to_owned()
            } else {
                snapshot
                    .iter()
                    .take(n)
                    .map(format_entry)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Show(id) => match monitor.get(&id).await {
            Some(entry) => format_details(&entry),
            None => format!("{id}: record is no longer buffered"),
        },
        Command::Health => monitor.health_check().await.to_string(),
        Command::Help => HELP.to_owned(),
        Command::Quit => return Reply::Quit,
    };
    Reply::Text(text)
}

/// One-line table row for a buffered record.
pub fn format_entry(entry: &BufferedRecord) -> String {
    let record = &entry.record;
    let status = match &entry.state {
        EnrichmentState::Pending => "-".to_owned(),
        EnrichmentState::InFlight => "analyzing...".to_owned(),
        EnrichmentState::Complete(verdict) => format!(
            "{} {}",
            verdict.severity,
            verdict.threat_type.as_deref().unwrap_or("clean")
        ),
    };
    format!(
        "{} {} {:<15} {:<4} {} {} [{}]",
        record.id,
        record.timestamp,
        record.source_ip,
        record.method,
        record.endpoint,
        record.status_code,
        status
    )
}

/// Multi-line detail view: raw line plus verdict and mitigation steps.
pub fn format_details(entry: &BufferedRecord) -> String {
    let record = &entry.record;
    let mut out = vec![
        format!("id:       {}", record.id),
        format!("time:     {}", record.timestamp),
        format!("source:   {}", record.source_ip),
        format!("request:  {} {} -> {}", record.method, record.endpoint, record.status_code),
        format!("message:  {}", record.message),
        format!("raw:      {}", record.raw),
    ];

    match &entry.state {
        EnrichmentState::Pending => out.push("analysis: not requested".to_owned()),
        EnrichmentState::InFlight => out.push("analysis: in progress".to_owned()),
        EnrichmentState::Complete(verdict) => {
            out.push(format!(
                "analysis: {} threat={} type={} confidence={:.0}%",
                verdict.severity,
                verdict.is_threat,
                verdict.threat_type.as_deref().unwrap_or("-"),
                verdict.confidence_score
            ));
            out.push(format!("summary:  {}", verdict.summary));
            for (i, step) in verdict.mitigation_steps.iter().enumerate() {
                out.push(format!("  {}. {}", i + 1, step));
            }
        }
    }
    out.join("\n")
}

/// Read commands until EOF, `quit` or cancellation.
///
/// `quit` cancels `shutdown` so the daemon stops as well. EOF only ends the
/// console.
pub async fn run_console<C, R, W>(
    monitor: StreamMonitor<C>,
    input: R,
    mut output: W,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    C: ThreatClassifier,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(format!("{HELP}\n").as_bytes()).await?;
    output.flush().await?;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::debug!("console input closed");
            break;
        };

        let reply = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => execute(&monitor, command).await,
            Err(message) => Reply::Text(message),
        };

        match reply {
            Reply::Text(text) => {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
            Reply::Quit => {
                tracing::info!("quit requested from console");
                shutdown.cancel();
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_defaults() {
        assert_eq!(parse_command("start").unwrap(), Some(Command::Start));
        assert_eq!(
            parse_command("burst").unwrap(),
            Some(Command::Burst(DEFAULT_BURST))
        );
        assert_eq!(parse_command("  BURST 20 ").unwrap(), Some(Command::Burst(20)));
        assert_eq!(
            parse_command("list").unwrap(),
            Some(Command::List(DEFAULT_LIST))
        );
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn parses_record_ids() {
        assert_eq!(
            parse_command("analyze log-1700000000000-4").unwrap(),
            Some(Command::Analyze(RecordId::new("log-1700000000000-4")))
        );
        assert!(parse_command("show").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("burst zero").is_err());
        assert!(parse_command("burst 0").is_err());
        assert!(parse_command("launch").is_err());
        assert!(parse_command("burst 1 2").is_err());
    }

    #[test]
    fn burst_size_is_capped() {
        assert_eq!(
            parse_command(&format!("burst {MAX_BURST}")).unwrap(),
            Some(Command::Burst(MAX_BURST))
        );
        assert!(parse_command(&format!("burst {}", MAX_BURST + 1)).is_err());
        assert!(parse_command("burst 18446744073709551615").is_err());
        assert!(parse_command("burst 99999999999999999999999").is_err());
    }
}
