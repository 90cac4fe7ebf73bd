use std::sync::LazyLock;

use isochem::{Charged, IpConfig, IpMolecule, IsochemError, MassTable, Massive, Result};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use rustyline::DefaultEditor;

static TABLE: LazyLock<MassTable> = LazyLock::new(MassTable::default);

fn main() -> rustyline::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    log::info!("loaded a mass table of {} elements", TABLE.element_count());

    let mut rl = DefaultEditor::new()?;
    while let Ok(line) = rl.readline("Molecule: ") {
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(&line)?;
        match molecule_info(&line) {
            Ok(info) => print!("{info}"),
            Err(diagnostic) => render(*diagnostic),
        }
    }
    Ok(())
}

/// Reads a line like `C6H6 resolution=10000 npeaks=20` and summarises the resulting molecule
fn molecule_info(line: &str) -> Result<String> {
    let mut words = line.split_whitespace();
    let formula = words.next().unwrap_or_default();
    let options: Vec<_> = words
        .map(|option| {
            option.split_once('=').ok_or_else(|| {
                Box::new(IsochemError::InvalidParameter {
                    key: option.to_owned(),
                    value: String::new(),
                    reason: "options must be written as key=value".to_owned(),
                })
            })
        })
        .collect::<Result<_>>()?;
    let config = IpConfig::from_options(options)?;
    log::debug!("calculating the isotope pattern of {formula} with {config:?}");
    let molecule = IpMolecule::new(&TABLE, formula, config)?;

    let mut lines = vec![
        format!("Composition: {}", molecule.composition()),
        format!("Charge: {}", molecule.charge()),
        format!("Monoisotopic Mass: {}", molecule.monoisotopic_mass().round_dp(6)),
        format!("FWHM: {:.6}", molecule.fwhm()),
        format!("Bar Pattern ({} peaks):", molecule.bar_pattern().len()),
    ];
    lines.extend(
        molecule
            .bar_pattern()
            .peaks()
            .map(|(mz, intensity)| format!("  {mz:>14.6}  {intensity:>10.4}")),
    );
    let (lower, upper) = molecule.bounds();
    lines.extend([
        format!("Bounds: {lower:.4} to {upper:.4}"),
        format!("Estimated Exact Mass: {:.6}", molecule.estimated_exact_mass()),
        format!("Molecular Weight: {:.6}", molecule.molecular_weight()),
        format!("Error: {:.3} ppm", molecule.error() * 1e6),
    ]);
    if let Some(warning) = molecule.accuracy_warning() {
        render(warning.clone());
    }

    Ok(lines.join("\n") + "\n\n")
}

fn render(diagnostic: impl Diagnostic) {
    let mut buf = String::new();
    match GraphicalReportHandler::new_themed(GraphicalTheme::unicode()).render_report(&mut buf, &diagnostic) {
        Ok(()) => println!("{buf}"),
        Err(_) => println!("{diagnostic}"),
    }
}
