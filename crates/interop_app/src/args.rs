//! Command-line argument parsing
//
// Only two flags, so no argument parser crate.

use std::path::PathBuf;

/// Result of parsing command-line arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub verbose: bool,
    /// Settings file to use instead of the one in the config directory
    pub config: Option<PathBuf>,
    /// Problems with the arguments. Parsing runs before logging exists, so
    /// the caller logs these once it is up.
    pub warnings: Vec<String>,
}

/// Parse the process arguments.
pub fn parse_args() -> ParsedArgs {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from<I>(args: I) -> ParsedArgs
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut parsed = ParsedArgs::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" | "--verbose" => parsed.verbose = true,
            "--config" => match args.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => parsed.warnings.push("--config needs a path, ignoring".to_string()),
            },
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    parsed.config = Some(PathBuf::from(path));
                } else {
                    parsed.warnings.push(format!("Ignoring unknown argument: {other}"));
                }
            }
        }
    }

    parsed
}
