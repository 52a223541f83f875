use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};

/// Plain progress lines on stdout: `[i/total] <name>` then `  <asset>: <status>`.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn format_event(event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::Species {
                index,
                total,
                label,
            } => format!("[{index}/{total}] {label}"),
            ProgressEvent::Asset { kind, status } => format!("  {kind}: {status}"),
        }
    }

    pub fn print_done(summary: &RunSummary) {
        if summary.updated > 0 {
            println!("[done] catalog updated -> {}", summary.output_path);
        } else {
            println!("[done] no changes");
        }
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", Self::format_event(&event));
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AssetStatus;
    use crate::domain::AssetKind;

    #[test]
    fn progress_lines() {
        let species = ProgressEvent::Species {
            index: 3,
            total: 120,
            label: "Turdus merula".to_string(),
        };
        assert_eq!(ConsoleOutput::format_event(&species), "[3/120] Turdus merula");

        let asset = ProgressEvent::Asset {
            kind: AssetKind::Spectrogram,
            status: AssetStatus::Skipped,
        };
        assert_eq!(ConsoleOutput::format_event(&asset), "  spectrogram: skip (exists)");

        let failed = ProgressEvent::Asset {
            kind: AssetKind::Image,
            status: AssetStatus::Error("timed out".to_string()),
        };
        assert_eq!(ConsoleOutput::format_event(&failed), "  image: ERROR timed out");
    }
}
