//! Command Line Interface (CLI) arguments.

use crate::date_index::parse_date;

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// ARC2 rainfall cache command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "ARC2_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "ARC2_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "ARC2_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/arc2-cache/certs/cert.pem",
        env = "ARC2_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/arc2-cache/certs/key.pem",
        env = "ARC2_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "ARC2_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// First day held by the cache (YYYYMMDD).
    ///
    /// The whole window is allocated at startup, 4 bytes per cell per day: about 2.4 MB per day
    /// for the 801x751 ARC2 grid, 2.6 GB for the default three years.
    #[arg(long, default_value = "20230101", value_parser = parse_date, env = "ARC2_WINDOW_START")]
    pub window_start: NaiveDate,
    /// Last day held by the cache (YYYYMMDD)
    #[arg(long, default_value = "20251231", value_parser = parse_date, env = "ARC2_WINDOW_END")]
    pub window_end: NaiveDate,
    /// Rows of each daily raster
    #[arg(long, default_value_t = 801, env = "ARC2_GRID_HEIGHT")]
    pub grid_height: usize,
    /// Columns of each daily raster
    #[arg(long, default_value_t = 751, env = "ARC2_GRID_WIDTH")]
    pub grid_width: usize,
    /// URL of the directory holding the daily archives
    #[arg(
        long,
        default_value = "https://ftp.cpc.ncep.noaa.gov/fews/fewsdata/africa/arc2/geotiff",
        env = "ARC2_ARCHIVE_URL"
    )]
    pub archive_url: Url,
    /// Directory for local copies of downloaded archives
    #[arg(long, default_value = "./data", env = "ARC2_ARCHIVE_DIR")]
    pub archive_dir: PathBuf,
    /// Directory for rasters extracted while decoding
    #[arg(long, default_value = "./data/tmp", env = "ARC2_SCRATCH_DIR")]
    pub scratch_dir: PathBuf,
    /// Timeout in seconds of each archive download attempt
    #[arg(long, default_value_t = 120, env = "ARC2_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,
    /// Number of retries of failed archive transfers
    #[arg(long, default_value_t = 2, env = "ARC2_FETCH_RETRIES")]
    pub fetch_retries: u32,
    /// Delay in milliseconds before the first retry, doubled on each further retry
    #[arg(long, default_value_t = 500, env = "ARC2_FETCH_RETRY_DELAY")]
    pub fetch_retry_delay: u64,
    /// Maximum number of concurrent archive downloads
    #[arg(
        long,
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "ARC2_DOWNLOAD_LIMIT"
    )]
    pub download_limit: u32,
    /// Maximum number of concurrent raster decodes. Default is the number of CPUs minus one
    #[arg(long, env = "ARC2_DECODE_LIMIT")]
    pub decode_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CommandLineArgs::try_parse_from(["arc2-cache"]).unwrap();
        assert_eq!(NaiveDate::from_ymd_opt(2023, 1, 1), Some(args.window_start));
        assert_eq!(NaiveDate::from_ymd_opt(2025, 12, 31), Some(args.window_end));
        assert_eq!((801, 751), (args.grid_height, args.grid_width));
        assert_eq!(PathBuf::from("./data"), args.archive_dir);
        assert_eq!(PathBuf::from("./data/tmp"), args.scratch_dir);
        assert_eq!(
            "https://ftp.cpc.ncep.noaa.gov/fews/fewsdata/africa/arc2/geotiff",
            args.archive_url.as_str()
        );
        assert_eq!(4, args.download_limit);
    }

    #[test]
    fn download_limit_must_be_positive() {
        assert!(CommandLineArgs::try_parse_from(["arc2-cache", "--download-limit", "0"]).is_err());
        let args = CommandLineArgs::try_parse_from(["arc2-cache", "--download-limit", "2"]).unwrap();
        assert_eq!(2, args.download_limit);
    }

    #[test]
    fn window_arguments() {
        let args = CommandLineArgs::try_parse_from([
            "arc2-cache",
            "--window-start",
            "20210301",
            "--window-end",
            "20210331",
        ])
        .unwrap();
        assert_eq!(NaiveDate::from_ymd_opt(2021, 3, 1), Some(args.window_start));
        assert_eq!(NaiveDate::from_ymd_opt(2021, 3, 31), Some(args.window_end));
    }

    #[test]
    fn malformed_date() {
        assert!(CommandLineArgs::try_parse_from(["arc2-cache", "--window-start", "2021-03-01"])
            .is_err());
    }
}
