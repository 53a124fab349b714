//! Contains the [InputOutputOpt] Trait for all input/output options and the [DataOutputMode] enum for the output mode

use crate::util::*;

/// Input/Output option set by a user
pub trait InputOutputOpt {
    /// Raw data files to read from, one per DAQ channel. Empty means stdin.
    fn input_files(&self) -> &[PathBuf];
    /// Stats output mode (file, stdout, none)
    fn stats_output_mode(&self) -> DataOutputMode;
    /// Stats output format (JSON, TOML)
    fn stats_output_format(&self) -> Option<DataOutputFormat>;
}

impl<T> InputOutputOpt for &T
where
    T: InputOutputOpt,
{
    fn input_files(&self) -> &[PathBuf] {
        (*self).input_files()
    }
    fn stats_output_mode(&self) -> DataOutputMode {
        (*self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<DataOutputFormat> {
        (*self).stats_output_format()
    }
}

impl<T> InputOutputOpt for Box<T>
where
    T: InputOutputOpt,
{
    fn input_files(&self) -> &[PathBuf] {
        (**self).input_files()
    }
    fn stats_output_mode(&self) -> DataOutputMode {
        (**self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<DataOutputFormat> {
        (**self).stats_output_format()
    }
}

impl<T> InputOutputOpt for Arc<T>
where
    T: InputOutputOpt,
{
    fn input_files(&self) -> &[PathBuf] {
        (**self).input_files()
    }
    fn stats_output_mode(&self) -> DataOutputMode {
        (**self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<DataOutputFormat> {
        (**self).stats_output_format()
    }
}

/// Enum for all possible data output modes.
#[derive(PartialEq, Debug, Clone)]
pub enum DataOutputMode {
    /// Write to a file.
    File(Box<Path>),
    /// Write to stdout.
    Stdout,
    /// Do not write data out.
    None,
}

impl fmt::Display for DataOutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOutputMode::File(p) => write!(f, "File({})", p.display()),
            DataOutputMode::Stdout => write!(f, "Stdout"),
            DataOutputMode::None => write!(f, "None"),
        }
    }
}

impl FromStr for DataOutputMode {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STDOUT" => Ok(DataOutputMode::Stdout),
            "NONE" => Ok(DataOutputMode::None),
            _ => Ok(DataOutputMode::File(Path::new(s).into())),
        }
    }
}

/// Enum for all possible data output formats.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum DataOutputFormat {
    /// JSON format.
    JSON,
    /// TOML format.
    TOML,
}

impl fmt::Display for DataOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOutputFormat::JSON => write!(f, "JSON"),
            DataOutputFormat::TOML => write!(f, "TOML"),
        }
    }
}

impl FromStr for DataOutputFormat {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JSON" => Ok(DataOutputFormat::JSON),
            "TOML" => Ok(DataOutputFormat::TOML),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Invalid data output format",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_output_modes() {
        assert_eq!(
            DataOutputMode::from_str("stdout").unwrap(),
            DataOutputMode::Stdout
        );
        assert_eq!(DataOutputMode::from_str("None").unwrap(), DataOutputMode::None);
        assert_eq!(
            DataOutputMode::from_str("stats.json").unwrap(),
            DataOutputMode::File(Path::new("stats.json").into())
        );
        assert_eq!(
            DataOutputMode::File(Path::new("out.toml").into()).to_string(),
            "File(out.toml)"
        );
    }

    #[test]
    fn parse_output_formats() {
        assert_eq!(
            DataOutputFormat::from_str("json").unwrap(),
            DataOutputFormat::JSON
        );
        assert_eq!(
            DataOutputFormat::from_str("TOML").unwrap(),
            DataOutputFormat::TOML
        );
        assert!(DataOutputFormat::from_str("yaml").is_err());
    }
}
