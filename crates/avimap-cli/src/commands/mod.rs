//! Command implementations.

pub mod match_cmd;
pub mod model;
pub mod run;
pub mod simulate;

use avimap::{GriddedLandCover, LandCover, UniformLandCover};

use crate::cli::LandCoverArgs;

/// Resolve the land-cover source: a raster file if given, otherwise a
/// uniform class.
pub(crate) fn load_land_cover(
    args: &LandCoverArgs,
) -> Result<Box<dyn LandCover>, Box<dyn std::error::Error>> {
    match &args.land_cover {
        Some(path) => Ok(Box::new(GriddedLandCover::from_json_file(path)?)),
        None => Ok(Box::new(UniformLandCover::new(args.land_cover_class))),
    }
}
