//! Convert command - express one coordinate in another reference system.

use globetiles::crs::{Coordinates, CrsRegistry};

use crate::error::CliError;

/// Arguments for the convert command.
pub struct ConvertArgs {
    pub from: String,
    pub to: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Run the convert command.
pub fn run(args: ConvertArgs) -> Result<(), CliError> {
    let registry = CrsRegistry::new();
    let converted = convert(&registry, &args)?;
    println!("{}", converted);
    Ok(())
}

fn convert(registry: &CrsRegistry, args: &ConvertArgs) -> Result<Coordinates, CliError> {
    let input = Coordinates::new(registry, args.from.as_str(), args.x, args.y, args.z)?;
    Ok(input.as_crs(registry, &args.to)?)
}
