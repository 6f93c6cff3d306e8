//! Messaging-channel command grammar.
//!
//! ```text
//! log <sport> <NN>min [<NN>km | <NN>m] [rpe<N>] [notes: ...]
//! fatigue <N> sleep <N> weight <N> [notes: ...]
//! today | summary | help
//! <6 digits>                       pairing code, always
//! ```
//!
//! Units may be attached (`45min`) or separated (`45 min`); keywords are
//! case-insensitive. Anything that does not start with a keyword is a chat
//! message for the coach.

use tricoach_db::models::Sport;

#[derive(Debug, Clone, PartialEq)]
pub struct LogCommand {
    pub sport: Sport,
    pub duration_min: i32,
    pub distance_km: Option<f64>,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsCommand {
    pub fatigue: Option<i16>,
    pub sleep_hours: Option<f64>,
    pub weight_kg: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCommand {
    Pair(String),
    Log(LogCommand),
    Metrics(MetricsCommand),
    Today,
    Summary,
    Help,
    /// Free text for the coach.
    Chat(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty message")]
    Empty,

    #[error("unknown sport {0:?} (use swim, bike, run or strength)")]
    UnknownSport(String),

    #[error("missing sport after `log`")]
    MissingSport,

    #[error("missing duration, e.g. `45min`")]
    MissingDuration,

    #[error("invalid {field} value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("unexpected {0:?}")]
    UnexpectedToken(String),

    #[error("`fatigue`, `sleep` or `weight` needs at least one value")]
    NoMetrics,
}

pub const USAGE: &str = "\
Commands:
  log <sport> <NN>min [<NN>km|<NN>m] [rpe<N>] [notes: ...]
  fatigue <N> sleep <N> weight <N> [notes: ...]
  today    planned sessions for today
  summary  this week's review
  help     this message
Anything else goes to your coach.";

fn is_pairing_code(text: &str) -> bool {
    text.len() == 6 && text.bytes().all(|b| b.is_ascii_digit())
}

/// Split off a trailing `notes: ...` (case-insensitive).
fn split_notes(text: &str) -> (&str, Option<String>) {
    match text.to_ascii_lowercase().find("notes:") {
        Some(idx) => {
            let notes = text[idx + "notes:".len()..].trim();
            let notes = (!notes.is_empty()).then(|| notes.to_string());
            (text[..idx].trim_end(), notes)
        }
        None => (text, None),
    }
}

fn parse_sport(token: &str) -> Result<Sport, CommandParseError> {
    match token {
        "ride" | "cycle" | "cycling" => Ok(Sport::Bike),
        "gym" | "weights" => Ok(Sport::Strength),
        "swimming" => Ok(Sport::Swim),
        "running" => Ok(Sport::Run),
        other => other
            .parse::<Sport>()
            .map_err(|_| CommandParseError::UnknownSport(other.to_string())),
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, CommandParseError> {
    value.parse::<T>().map_err(|_| CommandParseError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// Split a quantity into `(number, unit)`. The unit is either attached
/// (`45min`) or the following token (`45 min`); the flag reports the latter.
fn split_quantity<'a>(token: &'a str, next: Option<&'a str>) -> Option<(&'a str, &'a str, bool)> {
    let digits_end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    if digits_end == 0 {
        return None;
    }
    let (value, unit) = token.split_at(digits_end);
    if !unit.is_empty() {
        return Some((value, unit, false));
    }
    next.map(|unit| (value, unit, true))
}

fn parse_log(tokens: &[&str], notes: Option<String>) -> Result<ChannelCommand, CommandParseError> {
    let (&sport, rest) = tokens.split_first().ok_or(CommandParseError::MissingSport)?;
    let sport = parse_sport(sport)?;

    let mut duration_min = None;
    let mut distance_km = None;
    let mut rpe = None;

    let mut i = 0;
    while i < rest.len() {
        let token = rest[i];
        let next = rest.get(i + 1).copied();
        i += 1;

        if let Some(attached) = token.strip_prefix("rpe") {
            let value = if attached.is_empty() {
                i += 1;
                next.unwrap_or_default()
            } else {
                attached
            };
            let parsed: i16 = number("rpe", value)?;
            if !(1..=10).contains(&parsed) {
                return Err(CommandParseError::InvalidValue {
                    field: "rpe",
                    value: value.to_string(),
                });
            }
            rpe = Some(parsed);
            continue;
        }

        let Some((value, unit, unit_was_next)) = split_quantity(token, next) else {
            return Err(CommandParseError::UnexpectedToken(token.to_string()));
        };
        match unit {
            "min" | "mins" => duration_min = Some(number::<f64>("duration", value)?.round() as i32),
            "km" => distance_km = Some(number::<f64>("distance", value)?),
            "m" => distance_km = Some(number::<f64>("distance", value)? / 1000.0),
            _ => return Err(CommandParseError::UnexpectedToken(token.to_string())),
        }
        if unit_was_next {
            i += 1;
        }
    }

    Ok(ChannelCommand::Log(LogCommand {
        sport,
        duration_min: duration_min.ok_or(CommandParseError::MissingDuration)?,
        distance_km,
        rpe,
        notes,
    }))
}

fn parse_metrics(
    tokens: &[&str],
    notes: Option<String>,
) -> Result<ChannelCommand, CommandParseError> {
    let mut cmd = MetricsCommand {
        notes,
        ..MetricsCommand::default()
    };
    let mut iter = tokens.iter();
    while let Some(&key) = iter.next() {
        let value = iter.next().copied().unwrap_or_default();
        match key {
            "fatigue" => {
                let f: i16 = number("fatigue", value)?;
                if !(1..=10).contains(&f) {
                    return Err(CommandParseError::InvalidValue {
                        field: "fatigue",
                        value: value.to_string(),
                    });
                }
                cmd.fatigue = Some(f);
            }
            "sleep" => cmd.sleep_hours = Some(number("sleep", value.trim_end_matches('h'))?),
            "weight" => cmd.weight_kg = Some(number("weight", value.trim_end_matches("kg"))?),
            other => return Err(CommandParseError::UnexpectedToken(other.to_string())),
        }
    }
    if cmd.fatigue.is_none() && cmd.sleep_hours.is_none() && cmd.weight_kg.is_none() {
        return Err(CommandParseError::NoMetrics);
    }
    Ok(ChannelCommand::Metrics(cmd))
}

/// Parse one inbound message.
pub fn parse_command(text: &str) -> Result<ChannelCommand, CommandParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommandParseError::Empty);
    }
    if is_pairing_code(text) {
        return Ok(ChannelCommand::Pair(text.to_string()));
    }

    let (head, notes) = split_notes(text);
    let lowered = head.to_ascii_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    match tokens.as_slice() {
        ["today"] => Ok(ChannelCommand::Today),
        ["summary"] => Ok(ChannelCommand::Summary),
        ["help"] | ["/help"] | ["/start"] => Ok(ChannelCommand::Help),
        ["log", rest @ ..] => parse_log(rest, notes),
        [first, ..] if matches!(*first, "fatigue" | "sleep" | "weight") => {
            parse_metrics(&tokens, notes)
        }
        _ => Ok(ChannelCommand::Chat(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(text: &str) -> LogCommand {
        match parse_command(text).unwrap() {
            ChannelCommand::Log(l) => l,
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn six_digits_is_always_a_pairing_code() {
        assert_eq!(parse_command(" 042917 ").unwrap(), ChannelCommand::Pair("042917".into()));
        assert!(matches!(parse_command("1234567").unwrap(), ChannelCommand::Chat(_)));
        assert!(matches!(parse_command("12345a").unwrap(), ChannelCommand::Chat(_)));
    }

    #[test]
    fn full_log_command() {
        let l = log("log run 45min 8.5km rpe6 notes: legs felt heavy");
        assert_eq!(l.sport, Sport::Run);
        assert_eq!(l.duration_min, 45);
        assert_eq!(l.distance_km, Some(8.5));
        assert_eq!(l.rpe, Some(6));
        assert_eq!(l.notes.as_deref(), Some("legs felt heavy"));
    }

    #[test]
    fn metres_convert_to_km() {
        let l = log("Log Swim 40min 1900m");
        assert_eq!(l.sport, Sport::Swim);
        assert_eq!(l.distance_km, Some(1.9));
    }

    #[test]
    fn separated_units_and_rpe() {
        let l = log("log bike 90 min 45 km rpe 7");
        assert_eq!(l.duration_min, 90);
        assert_eq!(l.distance_km, Some(45.0));
        assert_eq!(l.rpe, Some(7));
    }

    #[test]
    fn notes_keep_their_case() {
        let l = log("log strength 30min NOTES: Squats 5x5");
        assert_eq!(l.notes.as_deref(), Some("Squats 5x5"));
    }

    #[test]
    fn log_errors() {
        assert_eq!(parse_command("log"), Err(CommandParseError::MissingSport));
        assert_eq!(
            parse_command("log rowing 30min"),
            Err(CommandParseError::UnknownSport("rowing".into()))
        );
        assert_eq!(parse_command("log run 8km"), Err(CommandParseError::MissingDuration));
        assert!(matches!(
            parse_command("log run 30min rpe12"),
            Err(CommandParseError::InvalidValue { field: "rpe", .. })
        ));
        assert!(matches!(
            parse_command("log run 30min quickly"),
            Err(CommandParseError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn metrics_command() {
        let cmd = parse_command("fatigue 4 sleep 7.5 weight 71.2 notes: slept badly").unwrap();
        assert_eq!(
            cmd,
            ChannelCommand::Metrics(MetricsCommand {
                fatigue: Some(4),
                sleep_hours: Some(7.5),
                weight_kg: Some(71.2),
                notes: Some("slept badly".into()),
            })
        );
    }

    #[test]
    fn partial_metrics() {
        let ChannelCommand::Metrics(m) = parse_command("sleep 8").unwrap() else {
            panic!("expected metrics");
        };
        assert_eq!(m.sleep_hours, Some(8.0));
        assert_eq!(m.fatigue, None);
    }

    #[test]
    fn keywords_and_chat() {
        assert_eq!(parse_command("TODAY").unwrap(), ChannelCommand::Today);
        assert_eq!(parse_command("summary").unwrap(), ChannelCommand::Summary);
        assert_eq!(parse_command("help").unwrap(), ChannelCommand::Help);
        assert_eq!(
            parse_command("Should I swap Thursday's ride?").unwrap(),
            ChannelCommand::Chat("Should I swap Thursday's ride?".into())
        );
        assert_eq!(parse_command("   "), Err(CommandParseError::Empty));
    }
}
