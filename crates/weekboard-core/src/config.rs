use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_iso_date;
use crate::drag::{
  ActivationConstraint,
  SensorConfig
};
use crate::scheduler::SchedulerOptions;

pub const CONFIG_ENV_VAR: &str =
  "WEEKBOARD_CONFIG";
pub const CONFIG_FILE_NAME: &str =
  "weekboard.toml";
pub const DEFAULT_START_DATE: &str =
  "2024-03-11";

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct Config {
  pub color:            bool,
  pub timezone:         Option<String>,
  pub start_date:       String,
  pub mobile_max_width: f64,
  pub drag:             DragConfig,
  #[serde(skip)]
  pub loaded_file:      Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      color:            true,
      timezone:         None,
      start_date:       DEFAULT_START_DATE
        .to_string(),
      mobile_max_width: 768.0,
      drag:             DragConfig::default(),
      loaded_file:      None
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct DragConfig {
  pub edge_threshold_px:      f64,
  pub autoscroll_interval_ms: u64,
  pub day_change_debounce_ms: u64,
  pub swipe_threshold_px:     f64,
  pub rollback_on_cancel:     bool,
  pub mouse:                  MouseSensor,
  pub touch:                  TouchSensor
}

impl Default for DragConfig {
  fn default() -> Self {
    Self {
      edge_threshold_px:      100.0,
      autoscroll_interval_ms: 750,
      day_change_debounce_ms: 300,
      swipe_threshold_px:     80.0,
      rollback_on_cancel:     false,
      mouse:                  MouseSensor::default(),
      touch:                  TouchSensor::default()
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct MouseSensor {
  pub distance_px: f64,
  pub delay_ms:    u64
}

impl Default for MouseSensor {
  fn default() -> Self {
    Self {
      distance_px: 50.0,
      delay_ms:    500
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct TouchSensor {
  pub delay_ms:     u64,
  pub tolerance_px: f64
}

impl Default for TouchSensor {
  fn default() -> Self {
    Self {
      delay_ms:     500,
      tolerance_px: 100.0
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    )?;

    let Some(path) = path else {
      debug!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    Self::load_file(&path)
  }

  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg =
      Self::from_toml_str(&text)
        .with_context(|| {
          format!(
            "invalid config {}",
            path.display()
          )
        })?;
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Config =
      toml::from_str(text).context(
        "failed parsing TOML"
      )?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// Applies `key=value` overrides on
  /// top of the loaded file. Keys may
  /// carry an `rc.` prefix; unknown keys
  /// are skipped.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key =
        k.strip_prefix("rc.").unwrap_or(&k);
      if self.set(key, &v)? {
        debug!(key = %key, value = %v, "applied override");
      } else {
        warn!(key = %key, "unknown config key; ignoring override");
      }
    }
    self.sanitize();
    Ok(())
  }

  /// Sets one dotted key. Returns
  /// `false` for keys it does not know.
  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<bool> {
    let drag = &mut self.drag;
    match key {
      | "color" => {
        self.color = parse_bool(key, value)?
      }
      | "timezone" => {
        let value = value.trim();
        self.timezone =
          (!value.is_empty())
            .then(|| value.to_string());
      }
      | "start_date" => {
        parse_iso_date(value)?;
        self.start_date =
          value.trim().to_string();
      }
      | "mobile_max_width" => {
        self.mobile_max_width =
          parse_number(key, value)?
      }
      | "drag.edge_threshold_px" => {
        drag.edge_threshold_px =
          parse_number(key, value)?
      }
      | "drag.autoscroll_interval_ms" => {
        drag.autoscroll_interval_ms =
          parse_millis(key, value)?
      }
      | "drag.day_change_debounce_ms" => {
        drag.day_change_debounce_ms =
          parse_millis(key, value)?
      }
      | "drag.swipe_threshold_px" => {
        drag.swipe_threshold_px =
          parse_number(key, value)?
      }
      | "drag.rollback_on_cancel" => {
        drag.rollback_on_cancel =
          parse_bool(key, value)?
      }
      | "drag.mouse.distance_px" => {
        drag.mouse.distance_px =
          parse_number(key, value)?
      }
      | "drag.mouse.delay_ms" => {
        drag.mouse.delay_ms =
          parse_millis(key, value)?
      }
      | "drag.touch.delay_ms" => {
        drag.touch.delay_ms =
          parse_millis(key, value)?
      }
      | "drag.touch.tolerance_px" => {
        drag.touch.tolerance_px =
          parse_number(key, value)?
      }
      | _ => return Ok(false)
    }
    Ok(true)
  }

  /// Resets zero, negative or
  /// non-finite settings to their
  /// defaults.
  pub fn sanitize(&mut self) {
    let defaults = Config::default();

    if !is_positive(
      self.mobile_max_width
    ) {
      warn!(
        value = self.mobile_max_width,
        "mobile_max_width must be \
         positive; using default"
      );
      self.mobile_max_width =
        defaults.mobile_max_width;
    }

    if parse_iso_date(&self.start_date)
      .is_err()
    {
      warn!(
        value = %self.start_date,
        "start_date is not a valid \
         date; using default"
      );
      self.start_date =
        defaults.start_date;
    }

    let widest_edge =
      self.mobile_max_width / 2.0;
    let drag = &mut self.drag;
    let fallback = defaults.drag;
    sanitize_px(
      "drag.edge_threshold_px",
      &mut drag.edge_threshold_px,
      fallback.edge_threshold_px
    );
    // Both edge zones must fit side by
    // side in the narrowest desktop
    // viewport.
    if drag.edge_threshold_px
      > widest_edge
    {
      warn!(
        value = drag.edge_threshold_px,
        limit = widest_edge,
        "drag.edge_threshold_px exceeds \
         half the desktop breakpoint; \
         using default"
      );
      drag.edge_threshold_px = fallback
        .edge_threshold_px
        .min(widest_edge);
    }
    sanitize_px(
      "drag.swipe_threshold_px",
      &mut drag.swipe_threshold_px,
      fallback.swipe_threshold_px
    );
    sanitize_px(
      "drag.mouse.distance_px",
      &mut drag.mouse.distance_px,
      fallback.mouse.distance_px
    );
    sanitize_px(
      "drag.touch.tolerance_px",
      &mut drag.touch.tolerance_px,
      fallback.touch.tolerance_px
    );
    sanitize_ms(
      "drag.autoscroll_interval_ms",
      &mut drag.autoscroll_interval_ms,
      fallback.autoscroll_interval_ms
    );
    sanitize_ms(
      "drag.day_change_debounce_ms",
      &mut drag.day_change_debounce_ms,
      fallback.day_change_debounce_ms
    );
    sanitize_ms(
      "drag.mouse.delay_ms",
      &mut drag.mouse.delay_ms,
      fallback.mouse.delay_ms
    );
    sanitize_ms(
      "drag.touch.delay_ms",
      &mut drag.touch.delay_ms,
      fallback.touch.delay_ms
    );
  }

  pub fn start_date(
    &self
  ) -> anyhow::Result<NaiveDate> {
    parse_iso_date(&self.start_date)
      .context(
        "invalid start_date in config"
      )
  }

  pub fn scheduler_options(
    &self
  ) -> SchedulerOptions {
    let drag = &self.drag;
    SchedulerOptions {
      sensors:             SensorConfig {
        mouse: ActivationConstraint {
          distance_px:  Some(
            drag.mouse.distance_px
          ),
          delay:        Some(
            Duration::from_millis(
              drag.mouse.delay_ms
            )
          ),
          tolerance_px: None
        },
        touch: ActivationConstraint {
          distance_px:  None,
          delay:        Some(
            Duration::from_millis(
              drag.touch.delay_ms
            )
          ),
          tolerance_px: Some(
            drag.touch.tolerance_px
          )
        }
      },
      edge_threshold_px:   drag
        .edge_threshold_px,
      autoscroll_interval:
        Duration::from_millis(
          drag.autoscroll_interval_ms
        ),
      day_change_debounce:
        Duration::from_millis(
          drag.day_change_debounce_ms
        ),
      swipe_threshold_px:  drag
        .swipe_threshold_px,
      mobile_max_width:    self
        .mobile_max_width,
      rollback_on_cancel:  drag
        .rollback_on_cancel
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(config_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if config_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      config_env
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory; using defaults"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join("weekboard")
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  key: &str,
  value: &str
) -> anyhow::Result<bool> {
  match value
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | _ => {
      Err(anyhow!(
        "invalid boolean for {key}: \
         {value}"
      ))
    }
  }
}

fn parse_number(
  key: &str,
  value: &str
) -> anyhow::Result<f64> {
  value.trim().parse::<f64>().map_err(
    |_| {
      anyhow!(
        "invalid number for {key}: \
         {value}"
      )
    }
  )
}

fn parse_millis(
  key: &str,
  value: &str
) -> anyhow::Result<u64> {
  value.trim().parse::<u64>().map_err(
    |_| {
      anyhow!(
        "invalid milliseconds for \
         {key}: {value}"
      )
    }
  )
}

fn is_positive(value: f64) -> bool {
  value.is_finite() && value > 0.0
}

fn sanitize_px(
  key: &str,
  value: &mut f64,
  fallback: f64
) {
  if !is_positive(*value) {
    warn!(key, value = *value, "setting must be positive; using default");
    *value = fallback;
  }
}

fn sanitize_ms(
  key: &str,
  value: &mut u64,
  fallback: u64
) {
  if *value == 0 {
    warn!(key, "interval must be non-zero; using default");
    *value = fallback;
  }
}
