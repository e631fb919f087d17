//! Schedule tool.
//!
//! Normalizes study durations ("2 weeks", "90 minutes", "1.5 hours") and
//! lays them out as a per-step, per-day or per-session breakdown.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::OnceLock;

use study_agent_core::{
    traits::Tool,
    types::{tool_names, PlanStep, ToolOutput},
    Error, Result, ToolError,
};

const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 24.0 * MINUTES_PER_HOUR;
const SESSION_MINUTES: u64 = 50;
/// Longest duration accepted: ten years.
pub const MAX_TOTAL_MINUTES: f64 = 10.0 * 365.0 * MINUTES_PER_DAY;

/// Unit a duration was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl DurationUnit {
    fn minutes(&self) -> f64 {
        match self {
            Self::Minute => 1.0,
            Self::Hour => MINUTES_PER_HOUR,
            Self::Day => MINUTES_PER_DAY,
            Self::Week => 7.0 * MINUTES_PER_DAY,
            Self::Month => 30.0 * MINUTES_PER_DAY,
        }
    }

    fn label(&self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Minute, false) => "minute",
            (Self::Minute, true) => "minutes",
            (Self::Hour, false) => "hour",
            (Self::Hour, true) => "hours",
            (Self::Day, false) => "day",
            (Self::Day, true) => "days",
            (Self::Week, false) => "week",
            (Self::Week, true) => "weeks",
            (Self::Month, false) => "month",
            (Self::Month, true) => "months",
        }
    }

    fn parse(unit: &str) -> Option<Self> {
        match unit {
            "m" | "min" | "mins" | "minute" | "minutes" => Some(Self::Minute),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hour),
            "d" | "day" | "days" => Some(Self::Day),
            "w" | "wk" | "wks" | "week" | "weeks" => Some(Self::Week),
            "month" | "months" => Some(Self::Month),
            _ => None,
        }
    }
}

/// A parsed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudyDuration {
    pub value: f64,
    pub unit: DurationUnit,
}

impl StudyDuration {
    pub fn total_minutes(&self) -> u64 {
        (self.value * self.unit.minutes()).round() as u64
    }

    /// Deadline when starting at `start`, or `None` if it is not representable.
    pub fn deadline_from(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let minutes = i64::try_from(self.total_minutes()).ok()?;
        start.checked_add_signed(TimeDelta::try_minutes(minutes)?)
    }
}

impl fmt::Display for StudyDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.value.fract() == 0.0 {
            format!("{}", self.value as u64)
        } else {
            format!("{}", self.value)
        };
        write!(f, "{} {}", value, self.unit.label(self.value != 1.0))
    }
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|wks?|w|months?)\b")
            .unwrap_or_else(|e| panic!("invalid duration regex: {e}"))
    })
}

/// Parse the first duration found in `text`.
pub fn parse_duration(text: &str) -> Result<StudyDuration> {
    let unparseable = || Error::Tool(ToolError::UnparseableDuration(text.trim().to_string()));

    let caps = duration_regex().captures(text).ok_or_else(unparseable)?;
    let value: f64 = caps[1].parse().map_err(|_| unparseable())?;
    let unit = DurationUnit::parse(&caps[2].to_lowercase()).ok_or_else(unparseable)?;
    if value <= 0.0 || value * unit.minutes() > MAX_TOTAL_MINUTES {
        return Err(unparseable());
    }
    Ok(StudyDuration { value, unit })
}

/// Format a minute count compactly ("2h 30m", "45m", "3d 4h").
pub fn format_minutes(minutes: u64) -> String {
    let days = minutes / MINUTES_PER_DAY as u64;
    let hours = (minutes % MINUTES_PER_DAY as u64) / 60;
    let mins = minutes % 60;
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if mins > 0 || parts.is_empty() {
        parts.push(format!("{}m", mins));
    }
    parts.join(" ")
}

/// Lay out a duration as readable text.
///
/// With steps: one entry per step with its own estimate. Without steps:
/// per day for multi-day durations (per week beyond two weeks), otherwise
/// as 50-minute sessions.
pub fn format_schedule(duration: &StudyDuration, steps: &[PlanStep]) -> String {
    let total = duration.total_minutes();
    let mut lines = vec![format!("Total: {} ({})", duration, format_minutes(total))];

    if !steps.is_empty() {
        let mut accounted = 0u64;
        for (i, step) in steps.iter().enumerate() {
            lines.push(format!("{}. {}: {}", i + 1, step.step, step.description));
            lines.push(format!("   Estimated time: {}", step.estimated_time));
            if let Ok(d) = parse_duration(&step.estimated_time) {
                accounted += d.total_minutes();
            }
        }
        if accounted > 0 {
            lines.push(format!(
                "Step estimates add up to {} of {}",
                format_minutes(accounted),
                format_minutes(total)
            ));
        }
        return lines.join("\n");
    }

    let days = (total as f64 / MINUTES_PER_DAY).ceil() as u64;
    if total as f64 >= MINUTES_PER_DAY && days > 14 {
        let weeks = days.div_ceil(7);
        for w in 1..=weeks {
            let first = (w - 1) * 7 + 1;
            let last = (w * 7).min(days);
            lines.push(format!("Week {}: days {}-{}", w, first, last));
        }
    } else if total as f64 >= MINUTES_PER_DAY {
        for d in 1..=days {
            lines.push(format!("Day {}: study block", d));
        }
    } else {
        let sessions = total.div_ceil(SESSION_MINUTES).max(1);
        let mut remaining = total;
        for s in 1..=sessions {
            let length = remaining.min(SESSION_MINUTES);
            remaining -= length;
            lines.push(format!("Session {}: {} min", s, length));
        }
    }
    lines.join("\n")
}

#[derive(Debug, Deserialize)]
struct ScheduleArgs {
    duration: String,
    #[serde(default)]
    steps: Vec<PlanStep>,
}

/// Schedule tool: `{"duration": "...", "steps": [...]}` → breakdown.
pub struct ScheduleTool;

#[async_trait]
impl Tool for ScheduleTool {
    fn name(&self) -> &str {
        tool_names::SCHEDULE
    }

    fn description(&self) -> &str {
        "Normalize a study duration and lay it out as a schedule"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "duration": {
                    "type": "string",
                    "description": "Duration such as '2 weeks', '3 days', '90 minutes' or '1.5 hours'"
                },
                "steps": {
                    "type": "array",
                    "description": "Optional plan steps with step, description and estimated_time",
                    "items": { "type": "object" }
                }
            },
            "required": ["duration"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: ScheduleArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let duration = parse_duration(&args.duration)?;
        let schedule = format_schedule(&duration, &args.steps);
        let deadline = duration.deadline_from(Utc::now());
        tracing::debug!(
            duration = %duration,
            minutes = duration.total_minutes(),
            steps = args.steps.len(),
            "Schedule built"
        );

        Ok(ToolOutput::text(schedule).with_data(json!({
            "canonical": duration.to_string(),
            "total_minutes": duration.total_minutes(),
            "deadline": deadline.map(|d| d.to_rfc3339()),
        })))
    }
}
