use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::Record;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Time,
    Level,
    Name,
    App,
    Message,
    Extra(String),
}

/// A compiled format pattern.
///
/// Placeholders are written `{field}`. The fields `time`, `level`, `name`, `app` and
/// `message` are built in; any other field is read from the record's extra metadata
/// and renders as `-` when missing. Failure context, when present, is appended on the
/// following lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pattern: String,
    segments: Vec<Segment>,
}

impl Layout {
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(field)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(pattern[last..whole.start()].to_string()));
            }
            segments.push(match field.as_str() {
                "time" => Segment::Time,
                "level" => Segment::Level,
                "name" => Segment::Name,
                "app" => Segment::App,
                "message" => Segment::Message,
                other => Segment::Extra(other.to_string()),
            });
            last = whole.end();
        }
        if last < pattern.len() {
            segments.push(Segment::Literal(pattern[last..].to_string()));
        }
        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Line layout used when a sink is registered without a pattern.
    pub fn default_for(app_name: Option<&str>) -> Self {
        if app_name.is_some() {
            Self::parse("[{time} {app}:{name} {level}] {message}")
        } else {
            Self::parse("[{time} {name} {level}] {message}")
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn render(&self, record: &Record<'_>, name: &str, app_name: Option<&str>) -> String {
        let mut line = String::with_capacity(self.pattern.len() + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Time => line.push_str(
                    &Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
                ),
                Segment::Level => line.push_str(&record.severity.colored().to_string()),
                Segment::Name => line.push_str(name),
                Segment::App => line.push_str(app_name.unwrap_or("-")),
                Segment::Message => line.push_str(record.message),
                Segment::Extra(key) => {
                    line.push_str(record.extra.get(key).map(String::as_str).unwrap_or("-"))
                }
            }
        }
        if let Some(failure) = record.failure {
            line.push('\n');
            line.push_str(&failure.to_string());
        }
        line
    }
}
