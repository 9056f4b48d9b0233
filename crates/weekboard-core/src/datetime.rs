use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

const TIMEZONE_ENV_VAR: &str =
  "WEEKBOARD_TIMEZONE";

pub const DAYS_PER_WEEK: usize = 7;

const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

const DAY_NAMES: [&str; DAYS_PER_WEEK] = [
  "Monday",
  "Tuesday",
  "Wednesday",
  "Thursday",
  "Friday",
  "Saturday",
  "Sunday"
];

const SHORT_DAY_NAMES: [&str;
  DAYS_PER_WEEK] = [
  "Mon", "Tue", "Wed", "Thu", "Fri",
  "Sat", "Sun"
];

/// Latest Monday on or before `date`.
#[must_use]
pub fn start_of_week(
  date: NaiveDate
) -> NaiveDate {
  let offset = date
    .weekday()
    .num_days_from_monday()
    as i64;
  add_days(date, -offset)
}

/// The seven dates of the week containing `date`, Monday first.
#[must_use]
pub fn week_dates(
  date: NaiveDate
) -> [NaiveDate; DAYS_PER_WEEK] {
  let monday = start_of_week(date);
  std::array::from_fn(|idx| {
    add_days(monday, idx as i64)
  })
}

/// Position of `date` inside its week, Monday = 0.
#[must_use]
pub fn weekday_index(
  date: NaiveDate
) -> usize {
  date
    .weekday()
    .num_days_from_monday()
    as usize
}

#[must_use]
pub fn shift_weeks(
  date: NaiveDate,
  weeks: i64
) -> NaiveDate {
  add_days(date, weeks * 7)
}

/// English month name for a zero-based month index.
#[must_use]
pub fn month_name(
  index: usize
) -> Option<&'static str> {
  MONTH_NAMES.get(index).copied()
}

#[must_use]
pub fn month_name_of(
  date: NaiveDate
) -> &'static str {
  MONTH_NAMES[date.month0() as usize]
}

#[must_use]
pub fn day_name(
  index: usize
) -> Option<&'static str> {
  DAY_NAMES.get(index).copied()
}

#[must_use]
pub fn short_day_name(
  index: usize
) -> Option<&'static str> {
  SHORT_DAY_NAMES.get(index).copied()
}

pub fn parse_iso_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid calendar date \
       (expected YYYY-MM-DD): {raw}"
    )
  })
}

#[must_use]
pub fn format_iso_date(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Parses the display time of a task into a time of day.
///
/// Accepts `HH:MM`, `H:MM`, `HH:MM:SS`, and 12-hour forms such as
/// `9:30 pm` or `9am`. Returns `None` for anything else.
#[must_use]
pub fn parse_time_of_day(
  raw: &str
) -> Option<NaiveTime> {
  let captures = clock_regex()?
    .captures(raw.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = match captures
    .name("minute")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None => 0
  };
  let second = match captures
    .name("second")
  {
    | Some(s) => {
      s.as_str().parse::<u32>().ok()?
    }
    | None => 0
  };

  let meridiem = captures
    .name("ampm")
    .map(|m| {
      m.as_str()
        .replace('.', "")
        .to_ascii_lowercase()
    });

  // A bare hour is only a time when it carries am/pm.
  if captures.name("minute").is_none()
    && meridiem.is_none()
  {
    return None;
  }

  let hour = if let Some(ampm) =
    meridiem
  {
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, second
  )
}

fn clock_regex() -> Option<&'static Regex>
{
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2})(?::(?P<second>\d{2}))?)?\s*(?P<ampm>[ap]\.?m\.?)?$",
      )
      .ok()
    })
    .as_ref()
}

fn relative_regex()
-> Option<&'static Regex> {
  static REL_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  REL_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$",
      )
      .ok()
    })
    .as_ref()
}

/// Resolves a user supplied anchor date relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(captures) =
    relative_regex()
      .and_then(|re| re.captures(&lower))
  {
    let num = captures["num"]
      .parse::<i64>()
      .with_context(|| {
        format!(
          "relative offset out of \
           range: {token}"
        )
      })?;
    let signed =
      if &captures["sign"] == "-" {
        -num
      } else {
        num
      };
    let days = match &captures["unit"]
    {
      | "w" => signed * 7,
      | _ => signed
    };
    return today
      .checked_add_signed(
        Duration::days(days)
      )
      .ok_or_else(|| {
        anyhow!(
          "relative date out of \
           range: {token}"
        )
      });
  }

  parse_iso_date(token).map_err(|_| {
    anyhow!(
      "unrecognized date \
       '{token}'. Supported: today, \
       tomorrow, yesterday, +Nd/-Nd, \
       +Nw/-Nw, YYYY-MM-DD"
    )
  })
}

/// Timezone used to resolve "today": the `WEEKBOARD_TIMEZONE`
/// environment variable wins over the configured value; UTC otherwise.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  chrono_tz::UTC
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now()
    .with_timezone(&tz)
    .date_naive()
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id"
      );
      None
    }
  }
}

fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}
