use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Duration;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::board::BoardSettings;
use crate::category::{
  Categories,
  DEFAULT_CATEGORIES
};
use crate::form::{
  DEFAULT_SUBMIT_DELAY_MS,
  DEFAULT_SUCCESS_MS,
  FormTimings
};
use crate::repository::DEFAULT_STORAGE_KEY;
use crate::search::DEFAULT_DEBOUNCE_MS;

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    let defaults = [
      ("data.location", "~/.taskeasy".to_string()),
      ("storage.key", DEFAULT_STORAGE_KEY.to_string()),
      ("categories", DEFAULT_CATEGORIES.join(",")),
      ("search.debounce", DEFAULT_DEBOUNCE_MS.to_string()),
      ("form.submit_delay", DEFAULT_SUBMIT_DELAY_MS.to_string()),
      ("form.success_duration", DEFAULT_SUCCESS_MS.to_string()),
      ("seed", "on".to_string()),
      ("color", "on".to_string())
    ];
    for (key, value) in defaults {
      map.insert(key.to_string(), value);
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    taskrc_override
  ))]
  pub fn load(
    taskrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let taskrc = resolve_taskrc_path(
      taskrc_override
    )?;
    if let Some(path) = taskrc {
      info!(taskrc = %path.display(), "loading taskeasyrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskeasyrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// Comma separated category list.
  pub fn categories(&self) -> Categories {
    match self.map.get("categories") {
      | Some(raw) => {
        Categories::new(raw.split(','))
      }
      | None => Categories::default()
    }
  }

  pub fn timings(&self) -> FormTimings {
    FormTimings {
      submit_delay:     self.millis(
        "form.submit_delay",
        DEFAULT_SUBMIT_DELAY_MS
      ),
      success_duration: self.millis(
        "form.success_duration",
        DEFAULT_SUCCESS_MS
      )
    }
  }

  pub fn debounce(&self) -> Duration {
    self.millis(
      "search.debounce",
      DEFAULT_DEBOUNCE_MS
    )
  }

  pub fn storage_key(&self) -> String {
    self
      .map
      .get("storage.key")
      .map(|k| k.trim())
      .filter(|k| !k.is_empty())
      .unwrap_or(DEFAULT_STORAGE_KEY)
      .to_string()
  }

  pub fn seed_enabled(&self) -> bool {
    self.get_bool("seed").unwrap_or(true)
  }

  pub fn color_enabled(&self) -> bool {
    self
      .get_bool("color")
      .unwrap_or(true)
  }

  pub fn timezone(
    &self
  ) -> Option<String> {
    self
      .map
      .get("timezone")
      .map(|tz| tz.trim().to_string())
      .filter(|tz| !tz.is_empty())
  }

  pub fn board_settings(
    &self
  ) -> BoardSettings {
    BoardSettings {
      categories:  self.categories(),
      timings:     self.timings(),
      storage_key: self.storage_key(),
      seed:        self.seed_enabled(),
      debounce:    self.debounce()
    }
  }

  fn millis(
    &self,
    key: &str,
    default: i64
  ) -> Duration {
    let Some(raw) = self.map.get(key)
    else {
      return Duration::milliseconds(
        default
      );
    };
    match raw.trim().parse::<i64>() {
      | Ok(ms) if ms >= 0 => {
        Duration::milliseconds(ms)
      }
      | _ => {
        warn!(key, value = %raw, "invalid millisecond value; using default");
        Duration::milliseconds(default)
      }
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = match raw_line
        .split_once('#')
      {
        | Some((before, _)) => {
          before.trim()
        }
        | None => raw_line.trim()
      };
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_taskrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TASKEASYRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       taskeasyrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskeasyrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".taskeasy"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::Duration;

  use super::Config;
  use crate::task::Category;

  #[test]
  fn defaults_match_builtin_values() {
    let cfg = Config::default();
    assert_eq!(
      cfg.storage_key(),
      "tasks"
    );
    assert!(cfg.seed_enabled());
    assert!(cfg.color_enabled());
    assert_eq!(cfg.timezone(), None);
    assert_eq!(
      cfg.debounce(),
      Duration::milliseconds(300)
    );
    assert_eq!(
      cfg.timings().success_duration,
      Duration::seconds(2)
    );
    assert_eq!(
      cfg
        .categories()
        .default_category(),
      Category::new("Work")
    );
  }

  #[test]
  fn rc_file_with_include_and_overrides()
  {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    fs::write(
      dir.path().join("extra.rc"),
      "search.debounce = 50\n"
    )
    .expect("write include");
    let rc = dir.path().join("main.rc");
    fs::write(
      &rc,
      "# taskeasy settings\n\
       categories = Errands, Music\n\
       seed = off   # no samples\n\
       include extra.rc\n"
    )
    .expect("write rc");

    let mut cfg = Config::load(Some(&rc))
      .expect("load rc");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert!(!cfg.seed_enabled());
    assert_eq!(
      cfg.debounce(),
      Duration::milliseconds(50)
    );
    assert_eq!(
      cfg
        .categories()
        .default_category(),
      Category::new("Errands")
    );

    cfg.apply_overrides([(
      "rc.storage.key".to_string(),
      "scratch".to_string()
    )]);
    assert_eq!(
      cfg.board_settings().storage_key,
      "scratch"
    );
  }

  #[test]
  fn invalid_line_is_an_error() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("bad.rc");
    fs::write(&rc, "not a setting\n")
      .expect("write rc");
    assert!(Config::load(Some(&rc)).is_err());
  }

  #[test]
  fn bad_millis_fall_back_to_defaults() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "form.submit_delay".to_string(),
        "-5".to_string()
      ),
      (
        "search.debounce".to_string(),
        "soon".to_string()
      )
    ]);
    assert_eq!(
      cfg.timings().submit_delay,
      Duration::milliseconds(300)
    );
    assert_eq!(
      cfg.debounce(),
      Duration::milliseconds(300)
    );
  }
}
