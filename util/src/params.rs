//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (NAV_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$NAV_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    // Get the params dir
    let mut path = crate::host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    // Load the file into a string
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    from_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

/// Load a parameter file, falling back to the default parameters if the file can't be loaded.
///
/// A malformed file is still reported as an error, only a missing software root or missing file
/// falls back to the defaults.
pub fn load_or_default<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned + Default,
{
    match load(param_file_path) {
        Ok(p) => Ok(p),
        Err(LoadError::SwRootNotSet) | Err(LoadError::FileLoadError(_)) => {
            warn!(
                "Could not find parameter file \"{}\", using defaults",
                param_file_path
            );
            Ok(P::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct TestParams {
        speed_ms: f64,
        count: usize,
    }

    impl Default for TestParams {
        fn default() -> Self {
            Self {
                speed_ms: 0.2,
                count: 3,
            }
        }
    }

    #[test]
    fn test_partial_params_use_defaults() {
        let p: TestParams = from_str("speed_ms = 0.5").unwrap();
        assert_eq!(
            p,
            TestParams {
                speed_ms: 0.5,
                count: 3
            }
        );
    }

    #[test]
    fn test_malformed_params() {
        let r: Result<TestParams, _> = from_str("speed_ms = \"fast\"");
        assert!(matches!(r, Err(LoadError::DeserialiseError(_))));
    }
}
