//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use image_harvester::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, RawQuery};

/// Search an image index and download the results.
///
/// Keywords, prefixes and suffixes expand into one query per combination;
/// every query's results are saved under the output directory, one
/// sub-directory per query.
#[derive(Parser, Debug)]
#[command(name = "image-harvester")]
#[command(author, version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent fetches (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// JSON file with a "Records" array; each record runs on top of these flags
    #[arg(long = "config-file", short = 'C')]
    pub config_file: Option<PathBuf>,

    /// JSON file replacing the built-in filter table
    #[arg(long)]
    pub filter_table: Option<PathBuf>,

    /// Keep existing files and save collisions as name_2.ext, name_3.ext, ...
    #[arg(long)]
    pub rename_collisions: bool,

    /// Comma-delimited search keywords
    #[arg(short = 'k', long)]
    pub keywords: Option<String>,

    /// Read additional keywords from a .txt or .csv file, one per line
    #[arg(long = "keywords-from-file", short = 'K')]
    pub keywords_from_file: Option<String>,

    /// Comma-delimited words placed before each keyword
    #[arg(long)]
    pub prefix_keywords: Option<String>,

    /// Comma-delimited words placed after each keyword
    #[arg(long)]
    pub suffix_keywords: Option<String>,

    /// Number of images to download per query
    #[arg(short = 'l', long)]
    pub limit: Option<u32>,

    /// Results to skip before downloading
    #[arg(short = 'o', long)]
    pub offset: Option<u32>,

    /// Image format filter (jpg, gif, png, bmp, svg, webp, ico, raw)
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Dominant color filter
    #[arg(long)]
    pub color: Option<String>,

    /// Color type filter (full-color, black-and-white, transparent)
    #[arg(long)]
    pub color_type: Option<String>,

    /// Usage rights filter
    #[arg(long)]
    pub usage_rights: Option<String>,

    /// Image size filter
    #[arg(long)]
    pub size: Option<String>,

    /// Image type filter (face, photo, clipart, line-drawing, animated)
    #[arg(long = "type", short = 't')]
    pub image_type: Option<String>,

    /// Image age filter
    #[arg(long)]
    pub time: Option<String>,

    /// Aspect ratio filter (tall, square, wide, panoramic)
    #[arg(long)]
    pub aspect_ratio: Option<String>,

    /// Result-page URL to scan instead of building one
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Download one image URL without searching
    #[arg(short = 'x', long)]
    pub single_image: Option<String>,

    /// Search for images similar to this image URL
    #[arg(short = 's', long)]
    pub similar_images: Option<String>,

    /// Restrict results to one site
    #[arg(long)]
    pub specific_site: Option<String>,

    /// Output root directory
    #[arg(short = 'O', long)]
    pub output_directory: Option<String>,

    /// Extra directory level above each query's directory
    #[arg(short = 'i', long)]
    pub image_directory: Option<String>,

    /// Save every image straight into the output root
    #[arg(short = 'n', long)]
    pub no_directory: bool,

    /// Proxy server (host:port)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Log each image URL as it is found
    #[arg(short = 'p', long)]
    pub print_urls: bool,

    /// Log each saved file's size
    #[arg(short = 'P', long)]
    pub print_size: bool,

    /// Per-fetch timeout in seconds
    #[arg(short = 'S', long)]
    pub socket_timeout: Option<f64>,

    /// Also download each result's thumbnail
    #[arg(short = 'T', long)]
    pub thumbnail: bool,

    /// Download only thumbnails
    #[arg(long)]
    pub thumbnail_only: bool,

    /// Word placed before every saved file name
    #[arg(short = 'a', long)]
    pub prefix: Option<String>,

    /// Word placed after every saved file stem
    #[arg(long)]
    pub suffix: Option<String>,

    /// Ask the index to filter explicit results
    #[arg(long)]
    pub safe_search: bool,

    /// List results without downloading them
    #[arg(short = 'N', long)]
    pub no_download: bool,

    /// Comma-delimited URL substrings to skip
    #[arg(long)]
    pub ignore_urls: Option<String>,

    /// Only report errors
    #[arg(long)]
    pub silent_mode: bool,

    /// File under the output root recording each image's source URL
    #[arg(long)]
    pub save_source: Option<String>,
}

impl Args {
    /// Returns the search options given on the command line as one record.
    #[must_use]
    pub fn to_raw_query(&self) -> RawQuery {
        RawQuery {
            keywords: self.keywords.clone(),
            keywords_from_file: self.keywords_from_file.clone(),
            prefix_keywords: self.prefix_keywords.clone(),
            suffix_keywords: self.suffix_keywords.clone(),
            limit: self.limit,
            offset: self.offset,
            format: self.format.clone(),
            color: self.color.clone(),
            color_type: self.color_type.clone(),
            usage_rights: self.usage_rights.clone(),
            size: self.size.clone(),
            image_type: self.image_type.clone(),
            time: self.time.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            url: self.url.clone(),
            single_image: self.single_image.clone(),
            similar_images: self.similar_images.clone(),
            specific_site: self.specific_site.clone(),
            output_directory: self.output_directory.clone(),
            image_directory: self.image_directory.clone(),
            no_directory: self.no_directory,
            proxy: self.proxy.clone(),
            print_urls: self.print_urls,
            print_size: self.print_size,
            socket_timeout: self.socket_timeout,
            thumbnail: self.thumbnail,
            thumbnail_only: self.thumbnail_only,
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            safe_search: self.safe_search,
            no_download: self.no_download,
            ignore_urls: self.ignore_urls.clone(),
            silent_mode: self.silent_mode,
            save_source: self.save_source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["image-harvester"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 10); // DEFAULT_CONCURRENCY
        assert_eq!(args.max_retries, 3); // DEFAULT_MAX_RETRIES
        assert!(args.keywords.is_none());
        assert!(!args.rename_collisions);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["image-harvester", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["image-harvester", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["image-harvester", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["image-harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["image-harvester", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["image-harvester", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["image-harvester", "-c", "100"]).unwrap();
        assert_eq!(args.concurrency, 100);

        let err = Args::try_parse_from(["image-harvester", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["image-harvester", "-c", "101"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_retries_bounds() {
        let args = Args::try_parse_from(["image-harvester", "-r", "0"]).unwrap();
        assert_eq!(args.max_retries, 0);

        let err = Args::try_parse_from(["image-harvester", "-r", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_limit_rejects_non_number() {
        let err = Args::try_parse_from(["image-harvester", "-l", "many"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_search_options_reach_raw_query() {
        let args = Args::try_parse_from([
            "image-harvester",
            "-k",
            "cat,dog",
            "--prefix-keywords",
            "red",
            "-l",
            "5",
            "--offset",
            "2",
            "--type",
            "photo",
            "--color",
            "red",
            "--specific-site",
            "example.com",
            "--thumbnail",
            "--safe-search",
            "--socket-timeout",
            "4.5",
            "--save-source",
            "sources",
        ])
        .unwrap();

        let raw = args.to_raw_query();
        assert_eq!(raw.keywords.as_deref(), Some("cat,dog"));
        assert_eq!(raw.prefix_keywords.as_deref(), Some("red"));
        assert_eq!(raw.limit, Some(5));
        assert_eq!(raw.offset, Some(2));
        assert_eq!(raw.image_type.as_deref(), Some("photo"));
        assert_eq!(raw.color.as_deref(), Some("red"));
        assert_eq!(raw.specific_site.as_deref(), Some("example.com"));
        assert!(raw.thumbnail);
        assert!(raw.safe_search);
        assert!(!raw.thumbnail_only);
        assert_eq!(raw.socket_timeout, Some(4.5));
        assert_eq!(raw.save_source.as_deref(), Some("sources"));
    }

    #[test]
    fn test_cli_unset_options_stay_unset() {
        let raw = Args::try_parse_from(["image-harvester"])
            .unwrap()
            .to_raw_query();
        assert_eq!(raw, RawQuery::default());
    }

    #[test]
    fn test_cli_config_file_and_filter_table_paths() {
        let args = Args::try_parse_from([
            "image-harvester",
            "--config-file",
            "records.json",
            "--filter-table",
            "filters.json",
            "--rename-collisions",
        ])
        .unwrap();
        assert_eq!(args.config_file, Some(PathBuf::from("records.json")));
        assert_eq!(args.filter_table, Some(PathBuf::from("filters.json")));
        assert!(args.rename_collisions);
    }
}
