//! Canadian Fire Weather Index terms and the `FireWeather` stream contract.
//!
//! FWI code *parsing* (reading a weather CSV, accumulating precipitation
//! into a daily stream) is left to the CLI's `io` layer; this module only
//! defines the data the core consumes (`FwiWeather`, `Wind`) and the trait
//! a weather source must implement (`FireWeather`), plus a
//! `ConstantWeather` stream used by the `surface`/`test` CLI modes and by
//! tests here.

/// Wind speed and direction at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wind {
    pub speed_kmh: f64,
    /// Compass direction wind is blowing *from*, degrees 0-360.
    pub direction_degrees: f64,
}

impl Wind {
    #[must_use]
    pub fn new(speed_kmh: f64, direction_degrees: f64) -> Self {
        Wind {
            speed_kmh,
            direction_degrees: direction_degrees.rem_euclid(360.0),
        }
    }
}

/// FFMC effect on ISI: the zero-wind fine fuel moisture function (ST-X-3 eq 25).
#[must_use]
pub fn ffmc_effect(ffmc: f64) -> f64 {
    let m = 147.2 * (101.0 - ffmc) / (59.5 + ffmc);
    91.9 * (-0.1386 * m).exp() * (1.0 + m.powi(5) / 4.93e7)
}

/// Initial Spread Index from wind speed and FFMC (ST-X-3 eq 24/25).
#[must_use]
pub fn isi(wind_speed_kmh: f64, ffmc: f64) -> f64 {
    0.208 * ffmc_effect(ffmc) * (0.05039 * wind_speed_kmh).exp()
}

/// Build-up Index from DMC and DC (ST-X-3 eq 27a/27b).
#[must_use]
pub fn bui(dmc: f64, dc: f64) -> f64 {
    if dmc <= 0.4 * dc {
        if dmc + dc > 0.0 {
            0.8 * dmc * dc / (dmc + 0.4 * dc)
        } else {
            0.0
        }
    } else {
        dmc - (1.0 - 0.8 * dc / (dmc + 0.4 * dc)) * (0.92 + (0.0114 * dmc).powf(1.7))
    }
}

/// Fire Weather Index from ISI and BUI (ST-X-3 eq 28-30).
#[must_use]
pub fn fwi(isi: f64, bui: f64) -> f64 {
    let fd = if bui <= 80.0 {
        0.626 * bui.powf(0.809) + 2.0
    } else {
        1000.0 / (25.0 + 108.64 * (-0.023 * bui).exp())
    };
    let b = 0.1 * isi * fd;
    if b > 1.0 {
        (2.72 * (0.434 * b.ln()).powf(0.647)).exp()
    } else {
        b
    }
}

/// One hour (or one day, for the daily stream) of Fire Weather Index data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FwiWeather {
    pub temp_c: f64,
    pub rh_percent: f64,
    pub wind: Wind,
    pub precip_mm: f64,
    pub ffmc: f64,
    pub dmc: f64,
    pub dc: f64,
    pub isi: f64,
    pub bui: f64,
    pub fwi: f64,
}

impl FwiWeather {
    /// Construct from the primary codes, deriving ISI/BUI/FWI rather than
    /// trusting whatever a weather file claims for them (the daily stream
    /// especially needs this since ISI/BUI there are recomputed from the
    /// noon-accumulated precipitation, not copied from an hourly row).
    #[must_use]
    pub fn derive(temp_c: f64, rh_percent: f64, wind: Wind, precip_mm: f64, ffmc: f64, dmc: f64, dc: f64) -> Self {
        let isi_v = isi(wind.speed_kmh, ffmc);
        let bui_v = bui(dmc, dc);
        let fwi_v = fwi(isi_v, bui_v);
        FwiWeather {
            temp_c,
            rh_percent,
            wind,
            precip_mm,
            ffmc,
            dmc,
            dc,
            isi: isi_v,
            bui: bui_v,
            fwi: fwi_v,
        }
    }
}

/// A source of hourly and daily FWI data indexed by hours since the
/// scenario's start time, plus the foliar-moisture offset `nd` for any day
/// in range.
pub trait FireWeather: Send + Sync {
    /// Hourly weather at `hours_from_start`, or `None` past the end of the stream.
    fn hourly(&self, hours_from_start: i32) -> Option<FwiWeather>;

    /// Daily (noon-accumulated) weather for the day containing `hours_from_start`.
    fn daily(&self, hours_from_start: i32) -> Option<FwiWeather>;

    /// Days between the current date and the date of minimum foliar
    /// moisture content, used for the foliar moisture effect.
    fn nd(&self, hours_from_start: i32) -> i32;

    fn start_hour(&self) -> i32;

    fn last_hour(&self) -> i32;
}

/// A `FireWeather` stream with the same value at every hour, used by the
/// `surface` and `test` CLI modes where no weather file is supplied.
#[derive(Debug, Clone)]
pub struct ConstantWeather {
    hourly: FwiWeather,
    daily: FwiWeather,
    nd: i32,
    last_hour: i32,
}

impl ConstantWeather {
    #[must_use]
    pub fn new(ffmc: f64, dmc: f64, dc: f64, wind: Wind, nd: i32, duration_hours: i32) -> Self {
        let weather = FwiWeather::derive(20.0, 30.0, wind, 0.0, ffmc, dmc, dc);
        ConstantWeather {
            hourly: weather,
            daily: weather,
            nd,
            last_hour: duration_hours,
        }
    }
}

impl FireWeather for ConstantWeather {
    fn hourly(&self, hours_from_start: i32) -> Option<FwiWeather> {
        if (0..=self.last_hour).contains(&hours_from_start) {
            Some(self.hourly)
        } else {
            None
        }
    }

    fn daily(&self, hours_from_start: i32) -> Option<FwiWeather> {
        self.hourly(hours_from_start).map(|_| self.daily)
    }

    fn nd(&self, _hours_from_start: i32) -> i32 {
        self.nd
    }

    fn start_hour(&self) -> i32 {
        0
    }

    fn last_hour(&self) -> i32 {
        self.last_hour
    }
}

/// A `FireWeather` stream parsed from a weather CSV: one hourly row per
/// hour, one daily row per calendar day, both indexed from `start_hour`.
#[derive(Debug, Clone)]
pub struct WeatherStream {
    start_hour: i32,
    hourly: Vec<FwiWeather>,
    /// One daily entry per 24-hour block; `daily[i]` covers hours
    /// `[i*24, (i+1)*24)` relative to `start_hour`.
    daily: Vec<FwiWeather>,
    nd_by_day: Vec<i32>,
}

impl WeatherStream {
    #[must_use]
    pub fn new(start_hour: i32, hourly: Vec<FwiWeather>, daily: Vec<FwiWeather>, nd_by_day: Vec<i32>) -> Self {
        debug_assert_eq!(daily.len(), nd_by_day.len());
        WeatherStream {
            start_hour,
            hourly,
            daily,
            nd_by_day,
        }
    }

    fn day_index(&self, hours_from_start: i32) -> Option<usize> {
        if hours_from_start < 0 {
            return None;
        }
        let idx = (hours_from_start / 24) as usize;
        (idx < self.daily.len()).then_some(idx)
    }
}

impl FireWeather for WeatherStream {
    fn hourly(&self, hours_from_start: i32) -> Option<FwiWeather> {
        if hours_from_start < 0 {
            return None;
        }
        self.hourly.get(hours_from_start as usize).copied()
    }

    fn daily(&self, hours_from_start: i32) -> Option<FwiWeather> {
        self.day_index(hours_from_start).map(|i| self.daily[i])
    }

    fn nd(&self, hours_from_start: i32) -> i32 {
        self.day_index(hours_from_start).map_or(0, |i| self.nd_by_day[i])
    }

    fn start_hour(&self) -> i32 {
        self.start_hour
    }

    fn last_hour(&self) -> i32 {
        self.start_hour + self.hourly.len() as i32 - 1
    }
}

/// Foliar moisture content from `nd` (ST-X-3, see `FireSpread.h::foliarMoisture`).
#[must_use]
pub fn foliar_moisture(nd: i32) -> f64 {
    let nd = f64::from(nd);
    if nd >= 50.0 {
        120.0
    } else if nd >= 30.0 {
        32.9 + 3.17 * nd - 0.0288 * nd * nd
    } else {
        85.0 + 0.0189 * nd * nd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffmc_effect_increases_with_ffmc() {
        assert!(ffmc_effect(90.0) > ffmc_effect(70.0));
    }

    #[test]
    fn isi_increases_with_wind() {
        let low = isi(5.0, 90.0);
        let high = isi(30.0, 90.0);
        assert!(high > low);
    }

    #[test]
    fn bui_is_zero_when_dmc_and_dc_are_zero() {
        assert_eq!(bui(0.0, 0.0), 0.0);
    }

    #[test]
    fn foliar_moisture_saturates_past_nd_50() {
        assert_eq!(foliar_moisture(60), 120.0);
        assert_eq!(foliar_moisture(80), 120.0);
    }

    #[test]
    fn constant_weather_is_stable_across_hours() {
        let w = ConstantWeather::new(90.0, 35.0, 275.0, Wind::new(20.0, 180.0), 50, 24);
        assert_eq!(w.hourly(0), w.hourly(12));
        assert!(w.hourly(25).is_none());
    }

    #[test]
    fn weather_stream_daily_groups_by_24_hours() {
        let hourly: Vec<FwiWeather> = (0..48)
            .map(|_| FwiWeather::derive(20.0, 40.0, Wind::new(10.0, 0.0), 0.0, 88.0, 30.0, 200.0))
            .collect();
        let daily = vec![hourly[0], hourly[0]];
        let stream = WeatherStream::new(0, hourly, daily, vec![40, 40]);
        assert!(stream.daily(0).is_some());
        assert!(stream.daily(23).is_some());
        assert_eq!(stream.day_index(24), Some(1));
        assert!(stream.daily(48).is_none());
    }
}
