//! `framebridge validate`: schema-check a log of bridge messages.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use framebridge_proto::{Message, MessageType, Value};
use serde::Serialize;

use crate::{OutputFormat, describe};

/// Arguments for `framebridge validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Newline-delimited JSON file (default: stdin).
    pub file: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Fail if any line is not a valid message.
    #[arg(long)]
    pub strict: bool,
}

/// Verdict for one input line.
#[derive(Debug, Serialize)]
pub struct LineReport {
    /// 1-based line number.
    pub line: usize,
    /// Tag of the accepted message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageType>,
    /// Field summary of the accepted message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Why the line was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LineReport {
    fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let reports = match &args.file {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            check(BufReader::new(file))?
        }
        None => check(io::stdin().lock())?,
    };

    if matches!(args.format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            if let Some(err) = &r.error {
                println!("{:>5}  {}  {err}", r.line, "invalid".red());
            } else {
                let kind = r.kind.map(MessageType::as_str).unwrap_or_default();
                let detail = r.detail.as_deref().unwrap_or_default();
                println!("{:>5}  {}  {kind:<11} {detail}", r.line, "ok     ".green());
            }
        }
    }

    let invalid = reports.iter().filter(|r| !r.is_valid()).count();
    if args.strict && invalid > 0 {
        bail!("{invalid} of {} messages invalid", reports.len());
    }
    Ok(())
}

/// Validates every non-blank line of `input`.
pub fn check(input: impl BufRead) -> Result<Vec<LineReport>> {
    let mut reports = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read input")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let verdict = serde_json::from_str::<Value>(text)
            .map_err(|e| format!("not JSON: {e}"))
            .and_then(|data| Message::parse(&data).map_err(|e| e.to_string()));
        reports.push(match verdict {
            Ok(message) => LineReport {
                line: idx + 1,
                kind: Some(message.kind()),
                detail: Some(describe(&message)),
                error: None,
            },
            Err(error) => LineReport {
                line: idx + 1,
                kind: None,
                detail: None,
                error: Some(error),
            },
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;

    #[test]
    fn reports_each_line() {
        let input = Cursor::new(
            r#"{"type":"READY"}

{"type":"NAVIGATE","route":"/users"}
{"type":"ROUTE_CHANGE"}
not json
{"type":"AUTH_READY","user":null}
"#,
        );
        let reports = check(input).unwrap();
        let lines: Vec<usize> = reports.iter().map(|r| r.line).collect();
        assert_eq!(lines, [1, 3, 4, 5, 6]);

        assert_eq!(reports[0].kind, Some(MessageType::Ready));
        assert_eq!(reports[1].detail.as_deref(), Some("/users"));
        assert_eq!(
            reports[2].error.as_deref(),
            Some("unknown message type `ROUTE_CHANGE`")
        );
        assert!(reports[3].error.as_deref().is_some_and(|e| e.starts_with("not JSON")));
        assert_eq!(
            reports[4].error.as_deref(),
            Some("AUTH_READY message requires object field `user`")
        );
    }

    #[test]
    fn strict_mode_fails_on_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"EVENT","name":"saved"}}"#).unwrap();
        writeln!(file, r#"{{"type":"EVENT"}}"#).unwrap();

        let lenient = ValidateArgs {
            file: Some(file.path().to_path_buf()),
            format: OutputFormat::Json,
            strict: false,
        };
        assert!(run(&lenient).is_ok());

        let strict = ValidateArgs {
            strict: true,
            ..lenient
        };
        let err = run(&strict).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 messages invalid");
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = ValidateArgs {
            file: Some(PathBuf::from("/nonexistent/messages.ndjson")),
            format: OutputFormat::Table,
            strict: false,
        };
        assert!(run(&args).is_err());
    }
}
