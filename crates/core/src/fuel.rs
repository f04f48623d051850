//! Fuel behaviour contract and two illustrative fuel types.
//!
//! A single trait with per-fuel numeric parameters as data, rather than
//! one class per FBP fuel type. This module is that trait plus `C2Conifer`
//! and `O1Grass`, implementing the `rosBasic`/`buiEffect`/`lengthToBreadth`/
//! `criticalSurfaceIntensity` formulas from ST-X-3 equations 26, 54, 56, 79.

/// Inputs a [`FuelType`] needs to evaluate spread for one cell-hour.
/// Bundles the FBP terms that every fuel's formulas consume, computed
/// upstream from the hourly/daily FWI weather and the cell's slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadInputs {
    pub isi: f64,
    pub bui: f64,
    pub wind_speed_kmh: f64,
    pub foliar_moisture: f64,
    pub percent_slope: u8,
}

/// Output of a fuel's rate-of-spread calculation for one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosResult {
    pub ros_m_per_min: f64,
    pub is_crowning: bool,
}

/// Behaviour every FBP fuel type must provide. Numeric parameters (the `A`,
/// `B`, `C`, `BUI0`, `CBH`, `CFL` table values the original bakes in as
/// template arguments) live as plain fields on the implementing struct.
pub trait FuelType: Send + Sync {
    /// Numeric fuel code, matching the packed value in [`crate::cell::SpreadKey`].
    fn code(&self) -> u8;

    fn name(&self) -> &str;

    /// Whether this fuel type can sustain a crown fire.
    fn can_crown(&self) -> bool;

    /// Initial rate of spread from ISI alone, before BUI/slope/wind
    /// corrections (ST-X-3 eq 26).
    fn rate_of_spread(&self, inputs: &SpreadInputs) -> RosResult;

    /// Length-to-breadth ratio of the elliptical fire shape (ST-X-3 eq 79).
    fn length_to_breadth(&self, wind_speed_kmh: f64) -> f64;

    /// Surface Fuel Consumption (kg/m^2).
    fn surface_fuel_consumption(&self, bui: f64) -> f64;

    /// Crown Fuel Consumption (kg/m^2), given Crown Fraction Burned (ST-X-3 eq 66).
    fn crown_consumption(&self, cfb: f64) -> f64;

    /// Critical Surface Fire Intensity needed to start crowning (ST-X-3 eq 56).
    fn critical_surface_intensity(&self, foliar_moisture: f64) -> f64;

    /// BUI Effect multiplier on surface ROS (ST-X-3 eq 54).
    fn bui_effect(&self, bui: f64) -> f64;

    /// Probability in `[0, 1]` that a point surviving to this hour continues
    /// to survive, given the current conditions. Drives the scenario's
    /// extinction threshold test; fuels with no moisture-driven extinction
    /// (e.g. grass that's already cured) may return a constant.
    fn survival_probability(&self, inputs: &SpreadInputs) -> f64;
}

/// A fuel table: maps the fuel codes packed into a [`crate::cell::SpreadKey`]
/// back to the [`FuelType`] that knows how to evaluate them. Kept as a trait
/// rather than a concrete struct so the core crate doesn't need to know how
/// a fuel lookup table is built (from a `.csv`, a `.ini` section, whatever a
/// caller like `fire-sim-cli` chooses) — that's an external collaborator's
/// concern, not the engine's.
pub trait FuelLookup: Send + Sync {
    fn fuel(&self, code: u8) -> Option<&dyn FuelType>;
}

/// Parameters shared by the "standard" (non-composite) FBP fuels: ROS
/// table values, average BUI, crown geometry, and the `log(q)` BUI
/// exponent (ST-X-3 tables 6-8).
#[derive(Debug, Clone, Copy)]
struct StandardFuelParams {
    code: u8,
    a: f64,
    b: f64,
    c: f64,
    bui0: f64,
    cbh: f64,
    cfl: f64,
    log_q: f64,
    can_crown: bool,
}

impl StandardFuelParams {
    fn ros_basic(&self, isi: f64) -> f64 {
        self.a * (1.0 - (-self.b * isi).exp()).powf(self.c)
    }

    fn bui_effect(&self, bui: f64) -> f64 {
        if bui > 0.0 {
            (50.0 * self.log_q * (1.0 / bui - 1.0 / self.bui0)).exp()
        } else {
            1.0
        }
    }

    fn length_to_breadth(&self, ws: f64) -> f64 {
        1.0 + 8.729 * (1.0 - (-0.030 * ws).exp()).powf(2.155)
    }

    fn critical_surface_intensity(&self, foliar_moisture: f64) -> f64 {
        0.001 * self.cbh.powf(1.5) * (460.0 + 25.9 * foliar_moisture).powf(1.5)
    }
}

/// C-2 Boreal Spruce, a standard conifer fuel (ST-X-3 table 6-8 row C-2).
#[derive(Debug, Clone, Copy)]
pub struct C2Conifer {
    params: StandardFuelParams,
}

impl C2Conifer {
    #[must_use]
    pub fn new() -> Self {
        C2Conifer {
            params: StandardFuelParams {
                code: 2,
                a: 110.0,
                b: 0.0282,
                c: 1.5,
                bui0: 64.0,
                cbh: 3.0,
                cfl: 0.8,
                log_q: (0.8f64).ln(),
                can_crown: true,
            },
        }
    }
}

impl Default for C2Conifer {
    fn default() -> Self {
        C2Conifer::new()
    }
}

impl FuelType for C2Conifer {
    fn code(&self) -> u8 {
        self.params.code
    }

    fn name(&self) -> &str {
        "C-2"
    }

    fn can_crown(&self) -> bool {
        self.params.can_crown
    }

    fn rate_of_spread(&self, inputs: &SpreadInputs) -> RosResult {
        let rss = self.params.ros_basic(inputs.isi) * self.bui_effect(inputs.bui);
        let csi = self.critical_surface_intensity(inputs.foliar_moisture);
        let sfc = self.surface_fuel_consumption(inputs.bui);
        let rso = if sfc > 0.0 { csi / (300.0 * sfc) } else { f64::INFINITY };
        let is_crowning = self.can_crown() && rss > rso;
        RosResult { ros_m_per_min: rss, is_crowning }
    }

    fn length_to_breadth(&self, wind_speed_kmh: f64) -> f64 {
        self.params.length_to_breadth(wind_speed_kmh)
    }

    fn surface_fuel_consumption(&self, bui: f64) -> f64 {
        // C-2: SFC = 5.0 * (1 - exp(-0.0115 * BUI)) [ST-X-3 table 8]
        5.0 * (1.0 - (-0.0115 * bui).exp())
    }

    fn crown_consumption(&self, cfb: f64) -> f64 {
        self.params.cfl * cfb
    }

    fn critical_surface_intensity(&self, foliar_moisture: f64) -> f64 {
        self.params.critical_surface_intensity(foliar_moisture)
    }

    fn bui_effect(&self, bui: f64) -> f64 {
        self.params.bui_effect(bui)
    }

    fn survival_probability(&self, inputs: &SpreadInputs) -> f64 {
        // Conifer litter dries out with ISI; a smooth 0..1 curve saturating
        // at high ISI rather than the cured/not-cured step grass uses.
        (inputs.isi / (inputs.isi + 8.0)).clamp(0.0, 1.0)
    }
}

/// O-1a Matted Grass, a cured/uncured grass fuel with no crown phase.
#[derive(Debug, Clone, Copy)]
pub struct O1Grass {
    code: u8,
    /// Percent curing, 0-100. Below full cure ROS is reduced and survival
    /// probability scales down.
    percent_cured: f64,
}

impl O1Grass {
    #[must_use]
    pub fn new(percent_cured: f64) -> Self {
        O1Grass {
            code: 1,
            percent_cured: percent_cured.clamp(0.0, 100.0),
        }
    }

    fn curing_factor(&self) -> f64 {
        // O-1 curing factor [ST-X-3 eq 35 region]: negligible spread below
        // ~58% cured, full by 100%.
        let c = self.percent_cured;
        if c < 58.8 {
            0.005 * ((0.0633 * c).exp() - 1.0)
        } else {
            0.176 + 0.02 * (c - 58.8)
        }
    }
}

impl FuelType for O1Grass {
    fn code(&self) -> u8 {
        self.code
    }

    fn name(&self) -> &str {
        "O-1a"
    }

    fn can_crown(&self) -> bool {
        false
    }

    fn rate_of_spread(&self, inputs: &SpreadInputs) -> RosResult {
        let a = 190.0;
        let b = 0.0310;
        let c = 1.4;
        let rss = a * (1.0 - (-b * inputs.isi).exp()).powf(c) * self.curing_factor();
        RosResult { ros_m_per_min: rss, is_crowning: false }
    }

    fn length_to_breadth(&self, wind_speed_kmh: f64) -> f64 {
        1.0 + 8.729 * (1.0 - (-0.030 * wind_speed_kmh).exp()).powf(2.155)
    }

    fn surface_fuel_consumption(&self, _bui: f64) -> f64 {
        // Grass fuel load is driven entirely by curing, not BUI.
        0.3 + 0.0017 * self.percent_cured
    }

    fn crown_consumption(&self, _cfb: f64) -> f64 {
        0.0
    }

    fn critical_surface_intensity(&self, _foliar_moisture: f64) -> f64 {
        f64::INFINITY
    }

    fn bui_effect(&self, _bui: f64) -> f64 {
        // Grass fuels have no BUI effect (ST-X-3 table 7 footnote).
        1.0
    }

    fn survival_probability(&self, _inputs: &SpreadInputs) -> f64 {
        if self.percent_cured >= 58.8 {
            1.0
        } else {
            self.percent_cured / 58.8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(isi: f64, bui: f64) -> SpreadInputs {
        SpreadInputs {
            isi,
            bui,
            wind_speed_kmh: 20.0,
            foliar_moisture: 97.0,
            percent_slope: 0,
        }
    }

    #[test]
    fn c2_ros_increases_with_isi() {
        let fuel = C2Conifer::new();
        let low = fuel.rate_of_spread(&inputs(2.0, 40.0)).ros_m_per_min;
        let high = fuel.rate_of_spread(&inputs(20.0, 40.0)).ros_m_per_min;
        assert!(high > low);
    }

    #[test]
    fn c2_bui_effect_caps_at_one_for_zero_bui() {
        let fuel = C2Conifer::new();
        assert!((fuel.bui_effect(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn grass_below_cure_threshold_has_reduced_spread() {
        let cured = O1Grass::new(100.0);
        let uncured = O1Grass::new(30.0);
        let i = inputs(10.0, 0.0);
        assert!(cured.rate_of_spread(&i).ros_m_per_min > uncured.rate_of_spread(&i).ros_m_per_min);
    }

    #[test]
    fn grass_cannot_crown() {
        let fuel = O1Grass::new(90.0);
        assert!(!fuel.can_crown());
        assert_eq!(fuel.crown_consumption(0.5), 0.0);
    }

    #[test]
    fn length_to_breadth_grows_with_wind() {
        let fuel = C2Conifer::new();
        assert!(fuel.length_to_breadth(30.0) > fuel.length_to_breadth(5.0));
    }

    struct TwoFuelTable {
        conifer: C2Conifer,
        grass: O1Grass,
    }

    impl FuelLookup for TwoFuelTable {
        fn fuel(&self, code: u8) -> Option<&dyn FuelType> {
            match code {
                2 => Some(&self.conifer),
                1 => Some(&self.grass),
                _ => None,
            }
        }
    }

    #[test]
    fn fuel_lookup_resolves_known_codes_and_rejects_unknown() {
        let table = TwoFuelTable { conifer: C2Conifer::new(), grass: O1Grass::new(100.0) };
        assert_eq!(table.fuel(2).unwrap().name(), "C-2");
        assert_eq!(table.fuel(1).unwrap().name(), "O-1a");
        assert!(table.fuel(99).is_none());
    }
}
