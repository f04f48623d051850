//! Hourly weather CSV parsing into one [`fire_sim_core::WeatherStream`] per
//! scenario column.
//!
//! Rows are grouped by integer scenario id; within a scenario hours must be
//! consecutive; every time the hour-of-day hits noon, the rolling 24h
//! precipitation total becomes that day's daily-stream entry and the
//! accumulator resets.
//!
//! Deliberately keeps a known-rough "yesterday" accounting rather than
//! fixing it: the caller-supplied `yesterday` [`fire_sim_core::FwiWeather`]
//! (built from the `--ffmc`/`--dmc`/`--dc`/`--apcp_prev` startup flags)
//! seeds the first day's accumulator and stands in for `prev` until the
//! stream's own first noon is reached, even though that's one day off from
//! what "yesterday" should mean relative to the first CSV row.

use std::collections::BTreeMap;
use std::path::Path;

use fire_sim_core::weather::WeatherStream;
use fire_sim_core::{FwiWeather, Wind};

use crate::error::CliError;

const EXPECTED_HEADER: &str = "Scenario,Date,PREC,TEMP,RH,WS,WD,FFMC,DMC,DC,ISI,BUI,FWI";

struct Row {
    scenario: u32,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    prec: f64,
    temp: f64,
    rh: f64,
    ws: f64,
    wd: f64,
    ffmc: f64,
    dmc: f64,
    dc: f64,
}

fn day_of_year(year: i32, month: u32, day: u32) -> i64 {
    const CUMULATIVE: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let mut doy = CUMULATIVE[(month - 1) as usize] + i64::from(day) - 1;
    if leap && month > 2 {
        doy += 1;
    }
    doy
}

fn parse_date(raw: &str, path: &Path) -> Result<(i32, u32, u32, u32), CliError> {
    // "YYYY-MM-DD HH:MM", the weather CSV's "Date" column format.
    let (date, time) = raw
        .split_once(' ')
        .ok_or_else(|| CliError::Parse(format!("{}: malformed date '{raw}'", path.display())))?;
    let mut parts = date.split('-');
    let bad = || CliError::Parse(format!("{}: malformed date '{raw}'", path.display()));
    let year: i32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let month: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let day: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let hour: u32 = time.split(':').next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    Ok((year, month, day, hour))
}

fn parse_rows(path: &Path) -> Result<Vec<Row>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| CliError::Parse(format!("{}: {e}", path.display())))?;

    let mut records = reader.records();
    let header = records
        .next()
        .ok_or_else(|| CliError::Parse(format!("{}: empty weather file", path.display())))?
        .map_err(|e| CliError::Parse(format!("{}: {e}", path.display())))?;
    let header_str: Vec<&str> = header.iter().collect();
    if header_str.join(",") != EXPECTED_HEADER {
        return Err(CliError::Parse(format!(
            "{}: expected header '{EXPECTED_HEADER}', got '{}'",
            path.display(),
            header_str.join(",")
        )));
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| CliError::Parse(format!("{}: {e}", path.display())))?;
        if record.is_empty() || record.get(0).map(str::is_empty).unwrap_or(true) {
            continue;
        }
        let field = |i: usize, name: &str| -> Result<&str, CliError> {
            record
                .get(i)
                .ok_or_else(|| CliError::Parse(format!("{}: row missing column {name}", path.display())))
        };
        let parse_f64 = |i: usize, name: &str| -> Result<f64, CliError> {
            field(i, name)?
                .parse()
                .map_err(|_| CliError::Parse(format!("{}: column {name} is not a number", path.display())))
        };
        let scenario: u32 = field(0, "Scenario")?
            .parse()
            .map_err(|_| CliError::Parse(format!("{}: Scenario column is not an integer", path.display())))?;
        let (year, month, day, hour) = parse_date(field(1, "Date")?, path)?;
        let prec = parse_f64(2, "PREC")?;
        if prec < 0.0 {
            return Err(CliError::Parse(format!("{}: negative precipitation {prec}", path.display())));
        }
        rows.push(Row {
            scenario,
            year,
            month,
            day,
            hour,
            prec,
            temp: parse_f64(3, "TEMP")?,
            rh: parse_f64(4, "RH")?,
            ws: parse_f64(5, "WS")?,
            wd: parse_f64(6, "WD")?,
            ffmc: parse_f64(7, "FFMC")?,
            dmc: parse_f64(8, "DMC")?,
            dc: parse_f64(9, "DC")?,
        });
    }
    Ok(rows)
}

/// Build one [`WeatherStream`] per scenario column in `path`.
///
/// `yesterday` seeds the rolling precipitation accumulator and the `prev`
/// reference used to build each scenario's first daily entry.
///
/// # Errors
/// Returns an error if the file can't be read, the header doesn't match,
/// hours within a scenario aren't consecutive, or precipitation is negative.
pub fn read_weather_streams(path: &Path, yesterday: FwiWeather) -> Result<BTreeMap<u32, WeatherStream>, CliError> {
    let rows = parse_rows(path)?;

    let mut by_scenario: BTreeMap<u32, Vec<&Row>> = BTreeMap::new();
    for row in &rows {
        by_scenario.entry(row.scenario).or_default().push(row);
    }

    let mut streams = BTreeMap::new();
    for (scenario, rows) in by_scenario {
        let min_doy = rows
            .iter()
            .map(|r| day_of_year(r.year, r.month, r.day))
            .min()
            .expect("scenario group is never empty");

        let mut hourly = Vec::with_capacity(rows.len());
        let mut daily: Vec<FwiWeather> = Vec::new();
        let mut apcp_24h = yesterday.precip_mm;
        let mut prev_doy_hour: Option<(i64, u32)> = None;

        for row in rows {
            let doy = day_of_year(row.year, row.month, row.day);
            if let Some((prev_doy, prev_hour)) = prev_doy_hour {
                let expected = (i64::from(prev_hour) + 1) % 24;
                let expected_doy = if expected == 0 { prev_doy + 1 } else { prev_doy };
                if doy != expected_doy || i64::from(row.hour) != expected {
                    return Err(CliError::Parse(format!(
                        "{}: scenario {scenario} has non-consecutive hours",
                        path.display()
                    )));
                }
            }
            prev_doy_hour = Some((doy, row.hour));

            let wind = Wind::new(row.ws, row.wd);
            let hour_wx = FwiWeather::derive(row.temp, row.rh, wind, row.prec, row.ffmc, row.dmc, row.dc);
            hourly.push(hour_wx);
            apcp_24h += row.prec;

            if row.hour == 12 {
                let day_wx = FwiWeather::derive(row.temp, row.rh, wind, apcp_24h, row.ffmc, row.dmc, row.dc);
                daily.push(day_wx);
                apcp_24h = 0.0;
            }
        }

        let nd_by_day = vec![0i32; daily.len().max(1)];
        // `WeatherStream::hourly`/`daily` index from 0 (the scenario's own
        // start), not from the calendar day-of-year, so `start_hour` is
        // always 0 here; `min_doy` only distinguishes scenarios that start
        // on different dates when the caller picks `start_day`.
        streams.insert(scenario, WeatherStream::new(0, hourly, daily, nd_by_day));
    }

    Ok(streams)
}
