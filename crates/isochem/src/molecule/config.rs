use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Charge, DropMethod, GroupMethod, IpMethod, IsochemError, Result};

pub const DEFAULT_DECIMAL_PLACES: u32 = 7;
pub const MAX_DECIMAL_PLACES: u32 = 12;
pub const DEFAULT_RESOLUTION: f64 = 5000.0;
/// The highest accepted resolution, well beyond that of any real instrument
pub const MAX_RESOLUTION: f64 = 1e7;
pub const DEFAULT_CHARGE: i64 = 1;
pub const DEFAULT_CRITICAL_ERROR: f64 = 3e-6;

/// Everything controlling how the isotope pattern of an [`IpMolecule`](crate::IpMolecule) is calculated
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IpConfig {
    /// How many decimal places of mass are tracked while generating the raw pattern
    pub decimal_places: u32,
    /// The resolution of the simulated instrument, which determines the FWHM of its peaks
    pub resolution: f64,
    pub ip_method: IpMethod,
    pub drop_method: DropMethod,
    pub group_method: GroupMethod,
    /// Only used when the formula itself doesn't carry a charge
    pub charge: Charge,
    /// The largest relative difference between the estimated exact mass and the molecular weight that's tolerated
    /// before an [`AccuracyWarning`](crate::AccuracyWarning) is raised
    pub critical_error: f64,
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            decimal_places: DEFAULT_DECIMAL_PLACES,
            resolution: DEFAULT_RESOLUTION,
            ip_method: IpMethod::default(),
            drop_method: DropMethod::default(),
            group_method: GroupMethod::default(),
            charge: Charge(DEFAULT_CHARGE),
            critical_error: DEFAULT_CRITICAL_ERROR,
        }
    }
}

impl IpConfig {
    /// Builds a configuration from `key=value` style options, starting from the defaults
    ///
    /// The recognised keys are `decpl`, `resolution`, `ipmethod`, `dropmethod`, `threshold`, `npeaks`,
    /// `consolidate`, `groupmethod`, `charge`, and `criticalerror`. At most one of `threshold`, `npeaks`, or
    /// `consolidate` can be given, and it selects the drop method unless `dropmethod` is also given (in which case
    /// the two must agree).
    pub fn from_options<K: AsRef<str>, V: AsRef<str>>(options: impl IntoIterator<Item = (K, V)>) -> Result<Self> {
        let mut config = Self::default();
        let mut drop_method = None;
        let mut threshold = None;
        let mut npeaks = None;
        let mut consolidate = None;

        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key.to_ascii_lowercase().as_str() {
                "decpl" => config.decimal_places = parse_value(key, value)?,
                "resolution" => config.resolution = parse_value(key, value)?,
                "ipmethod" => config.ip_method = value.parse()?,
                "dropmethod" => drop_method = Some(value.to_owned()),
                "threshold" => threshold = Some(parse_value(key, value)?),
                "npeaks" => npeaks = Some(parse_value(key, value)?),
                "consolidate" => consolidate = Some(parse_value(key, value)?),
                "groupmethod" => config.group_method = value.parse()?,
                "charge" => config.charge = Charge(parse_value(key, value)?),
                "criticalerror" => config.critical_error = parse_value(key, value)?,
                _ => {
                    return Err(Box::new(IsochemError::invalid_parameter(
                        key,
                        value,
                        "unknown parameter",
                    )));
                }
            }
        }

        config.drop_method = DropMethod::from_parts(drop_method.as_deref(), threshold, npeaks, consolidate)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is within its allowed range
    pub fn validate(&self) -> Result<()> {
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(Box::new(IsochemError::invalid_parameter(
                "decpl",
                &self.decimal_places.to_string(),
                format!("at most {MAX_DECIMAL_PLACES} decimal places can be tracked"),
            )));
        }
        if !(self.resolution > 0.0 && self.resolution <= MAX_RESOLUTION) {
            return Err(Box::new(IsochemError::invalid_parameter(
                "resolution",
                &self.resolution.to_string(),
                format!("must be a positive number no greater than {MAX_RESOLUTION:e}"),
            )));
        }
        if !(self.critical_error.is_finite() && self.critical_error >= 0.0) {
            return Err(Box::new(IsochemError::invalid_parameter(
                "criticalerror",
                &self.critical_error.to_string(),
                "must be a non-negative, finite number",
            )));
        }
        self.drop_method.validate()?;
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .parse()
        .map_err(|e: T::Err| Box::new(IsochemError::invalid_parameter(key, value, e)))
}
