//! Parameter file loading
//!
//! Parameter files are TOML documents stored under `$PNP_SW_ROOT/params`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (PNP_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot read the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Invalid parameters: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Path of a parameter file, relative to `$PNP_SW_ROOT/params`.
pub fn path_of(param_file: &str) -> Result<PathBuf, LoadError> {
    let root = crate::host::get_pnp_sw_root().map_err(|_| LoadError::SwRootNotSet)?;

    Ok(root.join("params").join(param_file))
}

/// Load and deserialise a parameter file.
pub fn load<P: DeserializeOwned>(param_file: &str) -> Result<P, LoadError> {
    let path = path_of(param_file)?;

    let params_str = fs::read_to_string(&path).map_err(|e| LoadError::FileLoadError(path, e))?;

    parse(&params_str)
}

/// Parse a parameter struct from a TOML string.
pub fn parse<P: DeserializeOwned>(params_str: &str) -> Result<P, LoadError> {
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Example {
        period_s: f64,
        names: Vec<String>,
    }

    #[test]
    fn test_parse() {
        let e: Example = parse("period_s = 0.5\nnames = [\"a\", \"b\"]\n").unwrap();

        assert_eq!(e.period_s, 0.5);
        assert_eq!(e.names, vec!["a", "b"]);

        match parse::<Example>("period_s = \"slow\"") {
            Err(LoadError::DeserialiseError(_)) => (),
            r => panic!("Expected a deserialise error, got {:?}", r),
        }
    }
}
