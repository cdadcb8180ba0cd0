use std::fs;
use std::path::PathBuf;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "taskeasy-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TASKEASY_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TASKEASY_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Resolves the zone used for calendar-day
/// bucketing: explicit setting, then
/// environment, then the time config file,
/// then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  tracing::debug!(
    "no timezone configured; using UTC"
  );
  chrono_tz::UTC
}

#[must_use]
pub fn local_date<Z: TimeZone>(
  dt: DateTime<Utc>,
  zone: &Z
) -> NaiveDate {
  dt.with_timezone(zone).date_naive()
}

/// `MMM d, yyyy` in the given zone.
#[must_use]
pub fn format_due_label(
  dt: DateTime<Utc>,
  zone: &Tz
) -> String {
  dt.with_timezone(zone)
    .format("%b %-d, %Y")
    .to_string()
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::trace!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  zone: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match zone
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

fn local_midnight(
  date: NaiveDate,
  zone: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {context}"
      )
    })?;
  to_utc_from_local(
    midnight, zone, context
  )
}

/// Parses a due-date expression relative to
/// `now`. Calendar words and plain dates
/// resolve to local midnight.
#[tracing::instrument(skip(now))]
pub fn parse_due_expr(
  input: &str,
  now: DateTime<Tz>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let zone = now.timezone();
  let today = now.date_naive();

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "due date cannot be empty"
      ));
    }
    | "now" => {
      return Ok(now.with_timezone(&Utc));
    }
    | "today" => {
      return local_midnight(
        today, &zone, "today"
      );
    }
    | "tomorrow" => {
      return local_midnight(
        today + Duration::days(1),
        &zone,
        "tomorrow"
      );
    }
    | "yesterday" => {
      return local_midnight(
        today - Duration::days(1),
        &zone,
        "yesterday"
      );
    }
    | _ => {}
  }

  let relative = Regex::new(
    r"^([+-]?)(\d+)\s*(h|hours?|d|days?|w|weeks?)$"
  )
  .context("invalid relative regex")?;
  if let Some(caps) =
    relative.captures(&lower)
  {
    let amount: i64 = caps[2]
      .parse()
      .context(
        "invalid relative amount"
      )?;
    let amount = if &caps[1] == "-" {
      -amount
    } else {
      amount
    };
    let step = match &caps[3] {
      | unit if unit.starts_with('h') => {
        Duration::try_hours(amount)
      }
      | unit if unit.starts_with('w') => {
        Duration::try_weeks(amount)
      }
      | _ => Duration::try_days(amount)
    };
    return step
      .and_then(|step| {
        now
          .with_timezone(&Utc)
          .checked_add_signed(step)
      })
      .ok_or_else(|| {
        anyhow!(
          "due date out of range: {token}"
        )
      });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(
      date,
      &zone,
      "calendar date"
    );
  }

  for format in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        token, format
      )
    {
      return to_utc_from_local(
        naive,
        &zone,
        "local datetime"
      );
    }
  }

  DateTime::parse_from_rfc3339(token)
    .map(|dt| dt.with_timezone(&Utc))
    .with_context(|| {
      format!(
        "unrecognized due date: \
         {token}"
      )
    })
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };
  use chrono_tz::Tz;

  use super::{
    format_due_label,
    local_date,
    parse_due_expr
  };

  fn berlin_now()
  -> chrono::DateTime<Tz> {
    let zone: Tz =
      "Europe/Berlin".parse().unwrap();
    Utc
      .with_ymd_and_hms(
        2026, 2, 17, 23, 30, 0
      )
      .single()
      .expect("valid now")
      .with_timezone(&zone)
  }

  #[test]
  fn today_is_local_midnight() {
    let now = berlin_now();
    let parsed =
      parse_due_expr("today", now)
        .expect("parse today");
    assert_eq!(
      parsed,
      Utc
        .with_ymd_and_hms(
          2026, 2, 17, 23, 0, 0
        )
        .unwrap()
    );
  }

  #[test]
  fn tomorrow_and_yesterday_shift_local_day()
  {
    let now = berlin_now();
    let tomorrow =
      parse_due_expr("tomorrow", now)
        .expect("parse tomorrow");
    let yesterday =
      parse_due_expr("yesterday", now)
        .expect("parse yesterday");
    let zone = now.timezone();
    assert_eq!(
      local_date(tomorrow, &zone)
        .to_string(),
      "2026-02-19"
    );
    assert_eq!(
      local_date(yesterday, &zone)
        .to_string(),
      "2026-02-17"
    );
  }

  #[test]
  fn relative_offsets_are_signed() {
    let now = berlin_now();
    let later =
      parse_due_expr("+3d", now)
        .expect("parse +3d");
    let earlier =
      parse_due_expr("-12h", now)
        .expect("parse -12h");
    let utc_now =
      now.with_timezone(&Utc);
    assert_eq!(
      later - utc_now,
      chrono::Duration::days(3)
    );
    assert_eq!(
      utc_now - earlier,
      chrono::Duration::hours(12)
    );
  }

  #[test]
  fn oversized_offsets_are_errors() {
    let now = berlin_now();
    for input in [
      "+999999999d",
      "-999999999d",
      "999999999999999w",
      "99999999999999999999h"
    ] {
      let err = parse_due_expr(input, now)
        .expect_err(input);
      assert!(
        !err.to_string().is_empty(),
        "{input}"
      );
    }
    assert!(
      parse_due_expr("+999999999d", now)
        .unwrap_err()
        .to_string()
        .contains("out of range")
    );
  }

  #[test]
  fn plain_dates_and_rfc3339() {
    let now = berlin_now();
    let date =
      parse_due_expr("2026-03-01", now)
        .expect("parse date");
    assert_eq!(
      date,
      Utc
        .with_ymd_and_hms(
          2026, 2, 28, 23, 0, 0
        )
        .unwrap()
    );

    let exact = parse_due_expr(
      "2023-12-31T00:00:00.000Z",
      now
    )
    .expect("parse rfc3339");
    assert_eq!(
      exact,
      Utc
        .with_ymd_and_hms(
          2023, 12, 31, 0, 0, 0
        )
        .unwrap()
    );

    assert!(
      parse_due_expr("someday", now)
        .is_err()
    );
  }

  #[test]
  fn due_label_uses_short_month() {
    let dt = Utc
      .with_ymd_and_hms(
        2024, 1, 5, 12, 0, 0
      )
      .unwrap();
    assert_eq!(
      format_due_label(
        dt,
        &chrono_tz::UTC
      ),
      "Jan 5, 2024"
    );
  }
}

/// ISO-8601 instants in UTC with
/// millisecond precision. Finer precision is
/// kept so values round-trip unchanged.
pub mod iso_instant_serde {
  use chrono::{
    DateTime,
    SecondsFormat,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn format(
    dt: &DateTime<Utc>
  ) -> String {
    let precision =
      if dt.timestamp_subsec_nanos()
        % 1_000_000
        == 0
      {
        SecondsFormat::Millis
      } else {
        SecondsFormat::AutoSi
      };
    dt.to_rfc3339_opts(precision, true)
  }

  pub fn parse(
    raw: &str
  ) -> Result<
    DateTime<Utc>,
    chrono::ParseError
  > {
    DateTime::parse_from_rfc3339(raw)
      .map(|dt| dt.with_timezone(&Utc))
  }

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer
      .serialize_str(&format(dt))
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse(&raw)
      .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::{
      DateTime,
      Utc
    };
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      dt: &Option<DateTime<Utc>>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<DateTime<Utc>>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      match opt {
        | Some(raw) => super::parse(&raw)
          .map(Some)
          .map_err(
            serde::de::Error::custom
          ),
        | None => Ok(None)
      }
    }
  }
}
