//! Fuel lookup table loader: `FUEL_LOOKUP_TABLE` maps raster fuel codes onto
//! the [`fire_sim_core::FuelType`] that evaluates them.
//!
//! `fire-sim-core` ships exactly two concrete fuels ([`C2Conifer`], an FBP
//! C-2, and [`O1Grass`], an FBP O-1a), so unlike the original's
//! `FuelLookupTable` (which resolves one of sixteen-plus `StandardFuel<...>`
//! instantiations per code) this table's job is narrower: read a small CSV
//! of `code,type[,percent_cured]` rows and bind each code to one of the two
//! fuels the core knows how to run, rejecting anything else up front rather
//! than failing later mid-simulation on an unknown code.

use std::collections::HashMap;
use std::path::Path;

use fire_sim_core::fuel::{C2Conifer, FuelType, O1Grass};
use fire_sim_core::FuelLookup;

use crate::error::CliError;

enum Entry {
    Conifer(C2Conifer),
    Grass(O1Grass),
}

impl Entry {
    fn as_fuel_type(&self) -> &dyn FuelType {
        match self {
            Entry::Conifer(f) => f,
            Entry::Grass(f) => f,
        }
    }
}

/// A fuel code &rarr; [`FuelType`] table built from `FUEL_LOOKUP_TABLE`.
pub struct FuelTable {
    entries: HashMap<u8, Entry>,
}

impl FuelLookup for FuelTable {
    fn fuel(&self, code: u8) -> Option<&dyn FuelType> {
        self.entries.get(&code).map(Entry::as_fuel_type)
    }
}

/// Load a fuel lookup table CSV with header `code,type,percent_cured`. `type`
/// is `C2` or `O1` (case-insensitive); `percent_cured` is read for `O1` rows
/// and ignored (but must still parse) for `C2` rows, so a single column
/// layout covers both fuels.
///
/// # Errors
/// Returns an error if the file can't be read, a row names an unsupported
/// fuel type, or a numeric field doesn't parse.
pub fn load(path: &Path) -> Result<FuelTable, CliError> {
    let mut reader = csv::Reader::from_path(path).with_path(path)?;
    let mut entries = HashMap::new();

    for record in reader.records() {
        let record = record.with_path(path)?;
        let code: u8 = record
            .get(0)
            .ok_or_else(|| CliError::Parse(format!("{}: row is missing a fuel code", path.display())))?
            .trim()
            .parse()
            .map_err(|_| CliError::Parse(format!("{}: fuel code is not a number", path.display())))?;
        let kind = record
            .get(1)
            .ok_or_else(|| CliError::Parse(format!("{}: row {code} is missing a fuel type", path.display())))?
            .trim();
        let percent_cured: f64 = record
            .get(2)
            .unwrap_or("100")
            .trim()
            .parse()
            .map_err(|_| CliError::Parse(format!("{}: row {code} has a non-numeric percent_cured", path.display())))?;

        let entry = match kind.to_ascii_uppercase().as_str() {
            "C2" | "C-2" => Entry::Conifer(C2Conifer::new()),
            "O1" | "O-1" | "O-1A" => Entry::Grass(O1Grass::new(percent_cured)),
            other => {
                return Err(CliError::Parse(format!(
                    "{}: row {code} names unsupported fuel type {other} (only C2/O1 are implemented)",
                    path.display()
                )))
            }
        };
        entries.insert(code, entry);
    }

    if entries.is_empty() {
        return Err(CliError::Parse(format!("{}: fuel lookup table has no rows", path.display())));
    }

    Ok(FuelTable { entries })
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Parse(e.to_string())
    }
}

trait CsvContext<T> {
    fn with_path(self, path: &Path) -> Result<T, CliError>;
}

impl<T> CsvContext<T> for Result<T, csv::Error> {
    fn with_path(self, path: &Path) -> Result<T, CliError> {
        self.map_err(|source| CliError::Parse(format!("{}: {source}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_table(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("fuel.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_conifer_and_grass_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_table(dir.path(), "code,type,percent_cured\n2,C2,100\n1,O1,80\n");
        let table = load(&path).unwrap();
        assert_eq!(table.fuel(2).unwrap().name(), "C-2");
        assert_eq!(table.fuel(1).unwrap().name(), "O-1a");
        assert!(table.fuel(99).is_none());
    }

    #[test]
    fn rejects_unsupported_fuel_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_table(dir.path(), "code,type,percent_cured\n5,D1,0\n");
        assert!(load(&path).is_err());
    }

    #[test]
    fn rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_table(dir.path(), "code,type,percent_cured\n");
        assert!(load(&path).is_err());
    }
}
