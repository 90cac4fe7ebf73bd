use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Charge, Composition, IsochemError, MassTable, Pattern, Result};

use super::{IpMolecule, config::IpConfig};

/// Bumped whenever the layout of [`MoleculeSnapshot`] changes
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable record of a calculated molecule, from which it can be restored without recalculating its patterns
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MoleculeSnapshot {
    pub version: u32,
    pub formula: String,
    /// The canonical (Hill-ordered) form of the molecule's composition
    pub composition: String,
    pub charge: Charge,
    pub config: IpConfig,
    pub fwhm: f64,
    pub raw: Pattern,
    pub bar: Pattern,
    /// Only present if the Gaussian pattern had been simulated when the snapshot was taken
    pub gaussian: Option<Pattern>,
}

impl<'a> IpMolecule<'a> {
    #[must_use]
    pub fn to_snapshot(&self) -> MoleculeSnapshot {
        MoleculeSnapshot {
            version: SNAPSHOT_VERSION,
            formula: self.formula.clone(),
            composition: self.composition.to_string(),
            charge: self.charge,
            config: self.config,
            fwhm: self.fwhm,
            raw: self.raw.clone(),
            bar: self.bar.clone(),
            gaussian: self.gaussian.get().cloned(),
        }
    }

    /// Restores a molecule from a snapshot, re-resolving its composition against `table`
    ///
    /// The stored patterns are checked for consistency, but are otherwise trusted as-is.
    pub fn from_snapshot(table: &'a MassTable, snapshot: MoleculeSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(invalid(format!(
                "expected version {SNAPSHOT_VERSION}, but found version {}",
                snapshot.version
            )));
        }
        snapshot.config.validate()?;

        let composition = Composition::new(table, &snapshot.composition)?;
        let charge = composition.formula_charge().unwrap_or(snapshot.config.charge);
        if charge != snapshot.charge {
            return Err(invalid(format!(
                "the recorded charge ({}) doesn't match the composition and configuration ({charge})",
                snapshot.charge
            )));
        }

        let patterns = [Some(&snapshot.raw), Some(&snapshot.bar), snapshot.gaussian.as_ref()];
        if !patterns.into_iter().flatten().all(Pattern::is_well_formed) {
            return Err(invalid("a pattern has unsorted masses or unpaired intensities"));
        }
        if !(snapshot.fwhm.is_finite() && snapshot.fwhm >= 0.0) {
            return Err(invalid(format!("{} is not a valid FWHM", snapshot.fwhm)));
        }

        let mut molecule = Self {
            formula: snapshot.formula,
            composition,
            charge,
            config: snapshot.config,
            fwhm: snapshot.fwhm,
            raw: snapshot.raw,
            bar: snapshot.bar,
            gaussian: snapshot.gaussian.map_or_else(OnceLock::new, OnceLock::from),
            accuracy_warning: None,
        };
        molecule.check_accuracy();
        Ok(molecule)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_snapshot()).map_err(invalid)
    }

    pub fn from_json(table: &'a MassTable, json: &str) -> Result<Self> {
        let snapshot = serde_json::from_str(json).map_err(invalid)?;
        Self::from_snapshot(table, snapshot)
    }
}

fn invalid(reason: impl ToString) -> Box<IsochemError> {
    Box::new(IsochemError::InvalidSnapshot(reason.to_string()))
}
