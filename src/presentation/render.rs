use crate::analysis::{AnalysisResult, ComponentDistribution};
use crate::events::EviveEvent;
use crate::session::SessionState;
use std::fmt;

/// Upper-case the first character and lower-case the rest
pub fn capitalize(item: &str) -> String {
    let mut chars = item.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn summary_line(result: &AnalysisResult) -> String {
    format!("Summary: {}", result.summary())
}

/// One column per bucket in payload order, rows padded to the longest bucket
pub fn category_table(distribution: &ComponentDistribution) -> String {
    let buckets = distribution.buckets();
    if buckets.is_empty() {
        return "(no components reported)".to_string();
    }

    let columns: Vec<(String, Vec<String>)> = buckets
        .iter()
        .map(|bucket| {
            let items = bucket.components.iter().map(|c| capitalize(c)).collect();
            (bucket.label.to_string(), items)
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .map(|(header, items)| {
            items
                .iter()
                .map(|item| item.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    // Trailing empty cells are dropped along with their separators
    let row = |mut cells: Vec<&str>| -> String {
        while cells.len() > 1 && cells.last() == Some(&"") {
            cells.pop();
        }
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(distribution.max_bucket_len() + 2);
    lines.push(row(columns.iter().map(|(header, _)| header.as_str()).collect()));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );

    for index in 0..distribution.max_bucket_len() {
        lines.push(row(columns
            .iter()
            .map(|(_, items)| items.get(index).map(String::as_str).unwrap_or(""))
            .collect()));
    }

    lines.join("\n")
}

pub fn action_text(result: &AnalysisResult) -> String {
    format!(
        "Swarm Action: {}\n\nSorter Decision: {}",
        result.swarm_action(),
        result.sorter_decision()
    )
}

pub fn reasoning_text(result: &AnalysisResult) -> String {
    format!("Reasoning: {}", result.reasoning())
}

/// Full result block shown after a successful analysis
pub fn render_result(result: &AnalysisResult) -> String {
    [
        summary_line(result),
        category_table(result.distribution()),
        action_text(result),
        reasoning_text(result),
    ]
    .join("\n\n")
}

/// One-line description of where the session stands
pub fn status_line(state: &SessionState) -> String {
    match state {
        SessionState::Idle => "No image captured yet".to_string(),
        SessionState::Capturing => "Capturing...".to_string(),
        SessionState::Ready(image) => format!(
            "Frame {} ready ({} bytes) - press 'a' to analyze",
            image.id(),
            image.size_bytes()
        ),
        SessionState::Analyzing(image) => format!("Analyzing frame {}...", image.id()),
        SessionState::Displaying { image, .. } => format!("Showing analysis of frame {}", image.id()),
        SessionState::Failed { error, .. } => format!("Error: {}", error),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

/// User-facing message derived from a session event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl StatusMessage {
    fn new<S: Into<String>>(level: MessageLevel, text: S) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            MessageLevel::Info => "[info]",
            MessageLevel::Success => "[ok]",
            MessageLevel::Error => "[error]",
        };
        write!(f, "{} {}", marker, self.text)
    }
}

/// Map a session event to the message the user should see, if any
pub fn status_message(event: &EviveEvent) -> Option<StatusMessage> {
    match event {
        EviveEvent::CaptureCompleted { .. } => Some(StatusMessage::new(
            MessageLevel::Success,
            "Image captured successfully!",
        )),
        EviveEvent::AnalysisCompleted { .. } => Some(StatusMessage::new(
            MessageLevel::Success,
            "Analysis completed successfully!",
        )),
        EviveEvent::OperationFailed { operation, error } => {
            let text = match *operation {
                "capture" => format!(
                    "Failed to capture image: {}. Check camera connection.",
                    error.message
                ),
                "analysis" => format!("Analysis failed: {}", error.message),
                other => format!("{} failed: {}", other, error.message),
            };
            Some(StatusMessage::new(MessageLevel::Error, text))
        }
        EviveEvent::CommandRejected { command, state } => Some(StatusMessage::new(
            MessageLevel::Info,
            format!("Cannot {} while {}", command, state),
        )),
        EviveEvent::StateChanged { .. }
        | EviveEvent::StaleSignalDiscarded { .. }
        | EviveEvent::ShutdownRequested { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse;
    use crate::error::{ErrorDescriptor, ErrorKind};

    fn result() -> AnalysisResult {
        parse(
            r#"{"component_summary":"Total 3 components",
                "component_distribution":{"Reuse":["chip","RESISTOR"],"Repair":[],"Recycle":["wire"]},
                "swarm_action":"Collect the chip.",
                "sorter_decision":"Two bins.",
                "reasoning":"Chip intact."}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("chip"), "Chip");
        assert_eq!(capitalize("RESISTOR"), "Resistor");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("éclair"), "Éclair");
    }

    #[test]
    fn test_category_table_layout() {
        let table = category_table(result().distribution());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Reuse    | Repair | Recycle");
        assert_eq!(lines[1], "---------+--------+--------");
        assert_eq!(lines[2], "Chip     |        | Wire");
        assert_eq!(lines[3], "Resistor");
    }

    #[test]
    fn test_category_table_trailing_columns() {
        let result = parse(
            r#"{"component_summary":"s",
                "component_distribution":{"Reuse":["fan"],"Repair":["motor","pump"],"Recycle":[]},
                "swarm_action":"a","sorter_decision":"d","reasoning":"r"}"#,
        )
        .unwrap();
        let table = category_table(result.distribution());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[2], "Fan   | Motor");
        assert_eq!(lines[3], "      | Pump");
        assert!(lines.iter().all(|line| !line.ends_with('|')));
    }

    #[test]
    fn test_category_table_empty() {
        let empty = parse(
            r#"{"component_summary":"Nothing","component_distribution":{},
                "swarm_action":"","sorter_decision":"","reasoning":""}"#,
        )
        .unwrap();
        assert_eq!(
            category_table(empty.distribution()),
            "(no components reported)"
        );
    }

    #[test]
    fn test_action_text() {
        assert_eq!(
            action_text(&result()),
            "Swarm Action: Collect the chip.\n\nSorter Decision: Two bins."
        );
    }

    #[test]
    fn test_render_result_sections() {
        let rendered = render_result(&result());
        assert!(rendered.starts_with("Summary: Total 3 components"));
        assert!(rendered.contains("Swarm Action: Collect the chip."));
        assert!(rendered.ends_with("Reasoning: Chip intact."));
    }

    #[test]
    fn test_status_messages() {
        let failed = EviveEvent::OperationFailed {
            operation: "analysis",
            error: ErrorDescriptor::new(ErrorKind::Parse, "Response is not valid JSON"),
        };
        let message = status_message(&failed).unwrap();
        assert_eq!(message.level, MessageLevel::Error);
        assert_eq!(message.text, "Analysis failed: Response is not valid JSON");

        let captured = EviveEvent::CaptureCompleted {
            image_id: 1,
            path: "evive_image.jpg".to_string(),
            size_bytes: 10,
        };
        assert_eq!(
            status_message(&captured).unwrap().to_string(),
            "[ok] Image captured successfully!"
        );

        let stale = EviveEvent::StaleSignalDiscarded {
            operation: "analysis",
            image_id: 1,
        };
        assert!(status_message(&stale).is_none());
    }

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(&SessionState::Idle), "No image captured yet");
        assert_eq!(status_line(&SessionState::Capturing), "Capturing...");
        let failed = SessionState::Failed {
            image: None,
            error: ErrorDescriptor::new(ErrorKind::Capture, "offline"),
        };
        assert_eq!(status_line(&failed), "Error: capture failed: offline");
    }
}
