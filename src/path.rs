//! Migration file name parsing.
//!
//! Migration files are named `<number>_<name>_up.<ext>` and `<number>_<name>_down.<ext>`,
//! for example `1_create_users_up.sql` and `1_create_users_down.sql`.

use std::path::Path;

use regex::Regex;

use crate::error::Error;
use crate::migration::Direction;

const MIGRATION_FILE_PATTERN: &str = r"^([0-9]+)_([A-Za-z0-9_]+)_(up|down)\.([A-Za-z0-9_]+)$";

/// The pieces of a migration file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub number: u64,
    pub direction: Direction,
    pub name: String,
}

/// Matches file names against the migration naming convention.
///
/// The pattern is compiled once when the parser is created; hold on to the parser
/// rather than building one per file.
#[derive(Debug, Clone)]
pub struct PathParser {
    pattern: Regex,
}

impl PathParser {
    pub fn new() -> Self {
        Self {
            // The pattern is a literal; failing to compile it is a programming error.
            pattern: Regex::new(MIGRATION_FILE_PATTERN).expect("valid migration file pattern"),
        }
    }

    /// Parse the base name of `path`.
    ///
    /// Returns [Error::InvalidMigrationFile] when the name does not follow the convention and
    /// [Error::InvalidMigrationNumber] when it does but the number is larger than `i64::MAX`.
    pub fn parse(&self, path: &Path) -> Result<ParsedPath, Error> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidMigrationFile(path.to_path_buf()))?;

        let captures = self
            .pattern
            .captures(file_name)
            .ok_or_else(|| Error::InvalidMigrationFile(path.to_path_buf()))?;

        // Tracking tables store the number in a signed 64-bit column.
        let number = captures[1]
            .parse::<i64>()
            .map_err(|source| Error::InvalidMigrationNumber {
                path: path.to_path_buf(),
                source,
            })?
            .unsigned_abs();
        let direction = match &captures[3] {
            "up" => Direction::Up,
            _ => Direction::Down,
        };

        Ok(ParsedPath {
            number,
            direction,
            name: captures[2].to_string(),
        })
    }
}

impl Default for PathParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_up_and_down_files() {
        let parser = PathParser::new();

        let up = parser.parse(Path::new("migrations/1_test_up.sql")).unwrap();
        assert_eq!(
            up,
            ParsedPath {
                number: 1,
                direction: Direction::Up,
                name: "test".to_string(),
            }
        );

        let down = parser
            .parse(Path::new("migrations/42_create_users_down.sql"))
            .unwrap();
        assert_eq!(
            down,
            ParsedPath {
                number: 42,
                direction: Direction::Down,
                name: "create_users".to_string(),
            }
        );
    }

    #[test]
    fn leading_zeros_only_carry_numeric_value() {
        let parser = PathParser::new();
        let parsed = parser.parse(Path::new("007_seed_up.psql")).unwrap();
        assert_eq!(parsed.number, 7);
        assert_eq!(parsed.name, "seed");
    }

    #[test]
    fn rejects_non_migration_files() {
        let parser = PathParser::new();
        for name in [
            "README.md",
            "test_up.sql",
            "1_test.sql",
            "1__up.sql",
            "1_test_sideways.sql",
            "1_test_up.sql.bak",
            "1_test-name_up.sql",
            "x1_test_up.sql",
        ] {
            assert!(
                matches!(
                    parser.parse(Path::new(name)),
                    Err(Error::InvalidMigrationFile(_))
                ),
                "{name} should not parse"
            );
        }
    }

    #[test]
    fn overflowing_number_is_a_distinct_error() {
        let parser = PathParser::new();
        let result = parser.parse(Path::new("99999999999999999999999_big_up.sql"));
        assert!(matches!(result, Err(Error::InvalidMigrationNumber { .. })));
        assert!(result.unwrap_err().is_skippable());
    }

    #[test]
    fn numbers_are_limited_to_the_storable_range() {
        let parser = PathParser::new();
        let largest = parser
            .parse(Path::new("9223372036854775807_last_up.sql"))
            .unwrap();
        assert_eq!(largest.number, i64::MAX as u64);

        for name in [
            "9223372036854775808_big_up.sql",
            "18446744073709551615_big_down.sql",
        ] {
            assert!(
                matches!(
                    parser.parse(Path::new(name)),
                    Err(Error::InvalidMigrationNumber { .. })
                ),
                "{name} should be rejected"
            );
        }
    }
}
