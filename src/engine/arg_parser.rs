use clap::Parser;
use std::path::PathBuf;

use crate::schema::ColumnDef;

struct DefaultArgs;

impl DefaultArgs {
    pub const ROOT: &'static str = ".";
}

/// Gather typed rows from `ROOT/<version>/<date>/<subfolder>/*.csv` into one table.
#[derive(Clone, Parser)]
#[command(name = "csvgather")]
#[command(about = "Validate, read and merge CSV files from a version/date directory tree.")]
pub struct Cli {
    /// Root of the version/date tree. Default: current directory.
    #[arg(value_name = "ROOT", default_value = DefaultArgs::ROOT)]
    pub root: PathBuf,

    /// Version directory selectors (literal names or `*` patterns). Can specify multiple: -V v1 v2
    #[arg(long, short = 'V', num_args = 1..)]
    pub versions: Vec<String>,

    /// Date directory selectors (literal names or `*` patterns), e.g. -d '2023-10-*'
    #[arg(long, short = 'd', num_args = 1..)]
    pub dates: Vec<String>,

    /// Subfolder under each date directory. Default: region.
    #[arg(long, short = 's')]
    pub subfolder: Option<String>,

    /// Column declaration `name:type[:required|optional][=default]`; type is integer, float, date or string.
    #[arg(long = "column", short = 'c', num_args = 1..)]
    pub columns: Vec<ColumnDef>,

    /// Reader threads. Default: derived from available parallelism and the open-file limit.
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Completed files buffered before compaction. Default: 100.
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Per-file read timeout in seconds. Slower files are skipped.
    #[arg(long, value_parser = clap::value_parser!(f64))]
    pub timeout: Option<f64>,

    /// Field delimiter: a single character, or `tab`.
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Write the merged table to this CSV file.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Config file. Default: `.csvgather.toml` in ROOT.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn parses_selectors_and_columns() {
        let cli = Cli::try_parse_from([
            "csvgather",
            "/data",
            "-V",
            "v1",
            "v2",
            "-d",
            "2023-10-*",
            "-c",
            "id:integer:required",
            "price:float:optional=0",
            "--timeout",
            "2.5",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/data"));
        assert_eq!(cli.versions, vec!["v1", "v2"]);
        assert_eq!(cli.dates, vec!["2023-10-*"]);
        assert_eq!(cli.columns.len(), 2);
        assert_eq!(cli.columns[0].ty, ColumnType::Integer);
        assert!(cli.columns[0].required);
        assert!(!cli.columns[1].required);
        assert_eq!(cli.timeout, Some(2.5));
        assert_eq!(cli.verbose, Some(true));
        assert_eq!(cli.json, None);
    }

    #[test]
    fn rejects_bad_column_declaration() {
        assert!(Cli::try_parse_from(["csvgather", "-c", "id:decimal"]).is_err());
    }
}
