use clap::{CommandFactory, ErrorKind, Parser};
use std::path::PathBuf;
use std::process;

mod convert;
mod error;
mod geometry;
mod palette;
mod planar;
mod png;
mod score;

use crate::convert::ConvertOptions;
use crate::geometry::SearchBounds;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    /// Input RAW file or directory containing RAW files
    #[clap(parse(try_from_str=file_exists))]
    input: PathBuf,

    /// Output file (for single input) or output directory (for directory input)
    output: Option<PathBuf>,

    /// How many best geometry candidates to emit per file
    #[clap(short = 'n', long, default_value_t = 5)]
    max_candidates: usize,

    /// The filename pattern to match for RAW files
    #[clap(short = 'p', long, default_value = "*.raw")]
    raw_file_pattern: String,

    /// Require palette footer; if false, use grayscale palette and treat all
    /// bytes as planar data
    #[clap(long, default_value_t = true, parse(try_from_str))]
    require_palette: bool,

    /// Minimum bitplane count to evaluate when guessing geometry
    #[clap(long, default_value_t = 3, parse(try_from_str=parse_planes))]
    min_planes: usize,

    /// Maximum bitplane count to evaluate when guessing geometry
    #[clap(long, default_value_t = 6, parse(try_from_str=parse_planes))]
    max_planes: usize,

    /// Minimum image width (pixels) to evaluate when guessing geometry
    #[clap(long, default_value_t = 64, parse(try_from_str=parse_width))]
    min_width: usize,

    /// Maximum image width (pixels) to evaluate when guessing geometry
    #[clap(long, default_value_t = 640, parse(try_from_str=parse_width))]
    max_width: usize,

    /// Minimum image height (pixels) allowed for a candidate
    #[clap(long, default_value_t = 1)]
    min_height: usize,

    /// Maximum image height (pixels) allowed for a candidate
    #[clap(long, default_value_t = 1024)]
    max_height: usize,

    /// Step (pixels) between tested widths when scanning candidates
    #[clap(long, default_value_t = 16, parse(try_from_str=parse_width))]
    width_increment: usize,

    /// Bytes to skip before the planar data (and palette footer)
    #[clap(long, default_value_t = 0)]
    header_skip: usize,

    /// Number of workers to score geometry candidates
    #[clap(short = 'w', long, default_value_t = 4)]
    workers: usize,
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    if args.min_width > args.max_width {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::ArgumentConflict,
            "min-width must not exceed max-width",
        )
        .exit();
    }

    if args.min_height > args.max_height {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::ArgumentConflict,
            "min-height must not exceed max-height",
        )
        .exit();
    }

    let opts = ConvertOptions {
        max_candidates: args.max_candidates,
        raw_file_pattern: args.raw_file_pattern,
        require_palette: args.require_palette,
        header_skip: args.header_skip,
        bounds: SearchBounds {
            min_planes: args.min_planes,
            max_planes: args.max_planes,
            min_width: args.min_width,
            max_width: args.max_width,
            min_height: args.min_height,
            max_height: args.max_height,
            width_increment: args.width_increment,
        },
        workers: args.workers.max(1),
    };

    match convert::run(&args.input, args.output.as_deref(), &opts) {
        Ok(0) => {}
        Ok(failures) => {
            println!("{} file(s) failed to convert", failures);
            process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}

fn file_exists(s: &str) -> Result<PathBuf, String> {
    let mut path = PathBuf::new();
    path.push(s);

    if !path.exists() {
        return Err(String::from("path does not exist"));
    }
    Ok(path)
}

/// Widths are constrained to multiples of 8 so that every scanned geometry
/// has a whole number of bytes per bitplane row.
fn parse_width(s: &str) -> Result<usize, String> {
    let width: usize = s
        .parse()
        .map_err(|_| format!("`{}` isn't a valid number", s))?;
    if width == 0 || width % 8 != 0 {
        return Err(String::from("must be a non-zero multiple of 8"));
    }
    Ok(width)
}

/// Pixel indices are stored one per byte, which caps the usable plane count
/// at 8 (256 colors).
fn parse_planes(s: &str) -> Result<usize, String> {
    let planes: usize = s
        .parse()
        .map_err(|_| format!("`{}` isn't a valid number", s))?;
    if planes < 1 || planes > 8 {
        return Err(String::from("must be between 1 and 8"));
    }
    Ok(planes)
}
