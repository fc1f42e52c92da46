//! User intents and the keyboard grammar that produces them.

use thiserror::Error;

use crate::types::{ConfigError, BREAK_MINUTES_RANGE, WORK_MINUTES_RANGE};

/// Something the user asked the widget to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetIntent {
    ToggleTimer,
    StartTimer,
    PauseTimer,
    ResetTimer,
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    /// New work length in minutes, already range-checked
    SetWorkMinutes(u32),
    /// New break length in minutes, already range-checked
    SetBreakMinutes(u32),
    Quit,
}

/// Errors from parsing an input line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("unknown key: {0:?}")]
    UnknownKey(String),

    #[error("expected a number of minutes after '{0}'")]
    MissingMinutes(char),

    #[error(transparent)]
    InvalidDuration(#[from] ConfigError),
}

/// Parses one line of keyboard input.
///
/// | input            | intent              |
/// |------------------|---------------------|
/// | space, `t`       | toggle the timer    |
/// | `s` / `p` / `r`  | start / pause / reset |
/// | `m`              | media play/pause    |
/// | `n` / `b`        | next / previous track |
/// | `w <min>`        | set work minutes    |
/// | `k <min>`        | set break minutes   |
/// | `q`              | quit                |
///
/// A line that is empty after trimming yields `Ok(None)`, except a bare
/// space which toggles the timer.
pub fn parse_intent(line: &str) -> Result<Option<WidgetIntent>, IntentError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line == " " {
        return Ok(Some(WidgetIntent::ToggleTimer));
    }

    let mut parts = line.split_whitespace();
    let Some(key) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();

    let intent = match key {
        "t" => WidgetIntent::ToggleTimer,
        "s" => WidgetIntent::StartTimer,
        "p" => WidgetIntent::PauseTimer,
        "r" => WidgetIntent::ResetTimer,
        "m" => WidgetIntent::TogglePlayPause,
        "n" => WidgetIntent::NextTrack,
        "b" => WidgetIntent::PreviousTrack,
        "q" => WidgetIntent::Quit,
        "w" => {
            let minutes = parse_minutes('w', argument)?;
            if !WORK_MINUTES_RANGE.contains(&minutes) {
                return Err(ConfigError::WorkMinutesOutOfRange(minutes).into());
            }
            WidgetIntent::SetWorkMinutes(minutes)
        }
        "k" => {
            let minutes = parse_minutes('k', argument)?;
            if !BREAK_MINUTES_RANGE.contains(&minutes) {
                return Err(ConfigError::BreakMinutesOutOfRange(minutes).into());
            }
            WidgetIntent::SetBreakMinutes(minutes)
        }
        other => return Err(IntentError::UnknownKey(other.to_string())),
    };
    Ok(Some(intent))
}

fn parse_minutes(key: char, argument: Option<&str>) -> Result<u32, IntentError> {
    argument
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or(IntentError::MissingMinutes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keys() {
        assert_eq!(parse_intent(" "), Ok(Some(WidgetIntent::ToggleTimer)));
        assert_eq!(parse_intent("t\n"), Ok(Some(WidgetIntent::ToggleTimer)));
        assert_eq!(parse_intent("s"), Ok(Some(WidgetIntent::StartTimer)));
        assert_eq!(parse_intent("p"), Ok(Some(WidgetIntent::PauseTimer)));
        assert_eq!(parse_intent("r"), Ok(Some(WidgetIntent::ResetTimer)));
        assert_eq!(parse_intent("m"), Ok(Some(WidgetIntent::TogglePlayPause)));
        assert_eq!(parse_intent("n"), Ok(Some(WidgetIntent::NextTrack)));
        assert_eq!(parse_intent("b"), Ok(Some(WidgetIntent::PreviousTrack)));
        assert_eq!(parse_intent("q\r\n"), Ok(Some(WidgetIntent::Quit)));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse_intent(""), Ok(None));
        assert_eq!(parse_intent("\n"), Ok(None));
    }

    #[test]
    fn test_durations_within_range() {
        assert_eq!(parse_intent("w 30"), Ok(Some(WidgetIntent::SetWorkMinutes(30))));
        assert_eq!(parse_intent("k 1"), Ok(Some(WidgetIntent::SetBreakMinutes(1))));
    }

    #[test]
    fn test_durations_out_of_range_are_rejected() {
        assert_eq!(
            parse_intent("w 61"),
            Err(IntentError::InvalidDuration(
                ConfigError::WorkMinutesOutOfRange(61)
            ))
        );
        assert_eq!(
            parse_intent("k 0"),
            Err(IntentError::InvalidDuration(
                ConfigError::BreakMinutesOutOfRange(0)
            ))
        );
    }

    #[test]
    fn test_missing_or_bad_minutes() {
        assert_eq!(parse_intent("w"), Err(IntentError::MissingMinutes('w')));
        assert_eq!(parse_intent("k abc"), Err(IntentError::MissingMinutes('k')));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            parse_intent("x"),
            Err(IntentError::UnknownKey("x".to_string()))
        );
    }
}
