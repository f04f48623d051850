//! `settings.ini` parsing: `KEY = value` lines, `#` comments, `[a,b,c]`
//! lists, into a [`fire_sim_core::Settings`] plus the two path keys the
//! core itself has no business resolving.
//!
//! Read every line, split on the first `#` then the first `=`, trim both
//! sides, collect into a map, then pull each expected key out of it (a
//! missing key is fatal).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fire_sim_core::{IntensityBands, Settings, ThresholdWeights};

use crate::error::{CliError, IoContext};

/// Settings loaded from `settings.ini`, split into the core's [`Settings`]
/// and the two filesystem paths the core never sees: raster root and fuel
/// lookup table resolution is the CLI's job.
pub struct LoadedSettings {
    pub settings: Settings,
    pub raster_root: PathBuf,
    pub fuel_lookup_table: PathBuf,
}

fn parse_ini(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let before_comment = line.split('#').next().unwrap_or("");
        let Some((key, value)) = before_comment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim().to_string();
        if !key.is_empty() {
            map.insert(key, value);
        }
    }
    map
}

fn get<'a>(map: &'a HashMap<String, String>, key: &str) -> Result<&'a str, CliError> {
    map.get(key)
        .map(String::as_str)
        .ok_or_else(|| CliError::Parse(format!("settings.ini is missing required key {key}")))
}

fn get_f64(map: &HashMap<String, String>, key: &str) -> Result<f64, CliError> {
    get(map, key)?
        .parse()
        .map_err(|_| CliError::Parse(format!("settings.ini key {key} is not a number")))
}

fn get_u64(map: &HashMap<String, String>, key: &str) -> Result<u64, CliError> {
    get(map, key)?
        .parse()
        .map_err(|_| CliError::Parse(format!("settings.ini key {key} is not an integer")))
}

/// Parse a bracketed, comma-separated integer list: `[1,2,3,7,14]`. Requires
/// the leading `[` and tolerates no spaces.
fn parse_int_list(key: &str, raw: &str) -> Result<Vec<i32>, CliError> {
    let raw = raw.trim();
    let Some(inner) = raw.strip_prefix('[') else {
        return Err(CliError::Parse(format!("{key} must start with '['")));
    };
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse()
                .map_err(|_| CliError::Parse(format!("{key} contains a non-integer entry: {s}")))
        })
        .collect()
}

/// Resolve `path` against `dir_root` unless it's already absolute.
fn resolve_path(dir_root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        dir_root.join(candidate)
    }
}

/// Load and parse `<dir_root>/settings.ini`.
///
/// # Errors
/// Returns an error if the file can't be read or a required key is missing
/// or malformed.
pub fn load(dir_root: &Path) -> Result<LoadedSettings, CliError> {
    let path = dir_root.join("settings.ini");
    let text = std::fs::read_to_string(&path).with_path(&path)?;
    let map = parse_ini(&text);

    let raster_root = resolve_path(dir_root, get(&map, "RASTER_ROOT")?);
    let fuel_lookup_table = resolve_path(dir_root, get(&map, "FUEL_LOOKUP_TABLE")?);

    let output_date_offsets = parse_int_list("OUTPUT_DATE_OFFSETS", get(&map, "OUTPUT_DATE_OFFSETS")?)?;

    let settings = Settings {
        minimum_ros: get_f64(&map, "MINIMUM_ROS")?.max(0.05),
        max_spread_distance: get_f64(&map, "MAX_SPREAD_DISTANCE")?,
        minimum_ffmc: get_f64(&map, "MINIMUM_FFMC")?,
        minimum_ffmc_at_night: get_f64(&map, "MINIMUM_FFMC_AT_NIGHT")?,
        offset_sunrise: get_f64(&map, "OFFSET_SUNRISE")?,
        offset_sunset: get_f64(&map, "OFFSET_SUNSET")?,
        confidence_level: get_f64(&map, "CONFIDENCE_LEVEL")?,
        maximum_time_seconds: get_u64(&map, "MAXIMUM_TIME")?,
        maximum_simulations: get_u64(&map, "MAXIMUM_SIMULATIONS")?,
        threshold_weights: ThresholdWeights {
            general: get_f64(&map, "THRESHOLD_SCENARIO_WEIGHT")?,
            daily: get_f64(&map, "THRESHOLD_DAILY_WEIGHT")?,
            hourly: get_f64(&map, "THRESHOLD_HOURLY_WEIGHT")?,
        },
        output_date_offsets,
        default_percent_conifer: get_f64(&map, "DEFAULT_PERCENT_CONIFER")?,
        default_percent_dead_fir: get_f64(&map, "DEFAULT_PERCENT_DEAD_FIR")?,
        intensity_bands: IntensityBands {
            min_value: 0.0,
            low_max: get_f64(&map, "INTENSITY_MAX_LOW")?,
            med_max: get_f64(&map, "INTENSITY_MAX_MODERATE")?,
            max_value: f64::INFINITY,
        },
        ..Settings::default()
    };

    Ok(LoadedSettings { settings, raster_root, fuel_lookup_table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ini_trims_keys_values_and_strips_comments() {
        let text = "MINIMUM_ROS = 0.05  # minimum rate\nOUTPUT_DATE_OFFSETS=[1,2,3]\n\n# full line comment\n";
        let map = parse_ini(text);
        assert_eq!(map.get("MINIMUM_ROS").unwrap(), "0.05");
        assert_eq!(map.get("OUTPUT_DATE_OFFSETS").unwrap(), "[1,2,3]");
    }

    #[test]
    fn int_list_parses_bracketed_csv() {
        assert_eq!(parse_int_list("X", "[1,2,3,7,14]").unwrap(), vec![1, 2, 3, 7, 14]);
    }

    #[test]
    fn int_list_rejects_missing_bracket() {
        assert!(parse_int_list("X", "1,2,3").is_err());
    }

    #[test]
    fn resolve_path_keeps_absolute_paths_as_is() {
        let root = Path::new("/data/run");
        assert_eq!(resolve_path(root, "/abs/fuel.csv"), PathBuf::from("/abs/fuel.csv"));
        assert_eq!(resolve_path(root, "rasters"), PathBuf::from("/data/run/rasters"));
    }

    #[test]
    fn load_reads_a_full_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.ini"),
            "RASTER_ROOT = rasters\n\
             FUEL_LOOKUP_TABLE = fuel.csv\n\
             MINIMUM_ROS = 0.05\n\
             MAX_SPREAD_DISTANCE = 5\n\
             MINIMUM_FFMC = 80\n\
             MINIMUM_FFMC_AT_NIGHT = 85\n\
             OFFSET_SUNRISE = 6\n\
             OFFSET_SUNSET = 20\n\
             CONFIDENCE_LEVEL = 0.05\n\
             MAXIMUM_TIME = 300\n\
             MAXIMUM_SIMULATIONS = 1000\n\
             THRESHOLD_SCENARIO_WEIGHT = 1\n\
             THRESHOLD_DAILY_WEIGHT = 1\n\
             THRESHOLD_HOURLY_WEIGHT = 1\n\
             OUTPUT_DATE_OFFSETS = [1,2,3]\n\
             DEFAULT_PERCENT_CONIFER = 50\n\
             DEFAULT_PERCENT_DEAD_FIR = 0\n\
             INTENSITY_MAX_LOW = 500\n\
             INTENSITY_MAX_MODERATE = 2000\n",
        )
        .unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.settings.output_date_offsets, vec![1, 2, 3]);
        assert_eq!(loaded.raster_root, dir.path().join("rasters"));
        assert_eq!(loaded.settings.minimum_ros, 0.05);
    }

    #[test]
    fn load_is_fatal_on_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.ini"), "RASTER_ROOT = rasters\n").unwrap();
        assert!(load(dir.path()).is_err());
    }
}
