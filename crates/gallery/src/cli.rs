use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "shader-gallery",
    author,
    version,
    about = "Browse, edit and live-reload GLSL fragment shaders",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Gallery root: an `http(s)://` URL or a local directory.
    #[arg(value_name = "SOURCE", env = "SHADER_GALLERY_SOURCE")]
    pub source: Option<String>,

    /// Shader to open first (`waves`, `/waves`, `#waves` or a full location).
    #[arg(long, value_name = "ROUTE")]
    pub route: Option<String>,

    /// How the fragment directory is enumerated.
    #[arg(long, value_enum, value_name = "KIND")]
    pub listing: Option<ListingArg>,

    /// How the current shader is written into the reflected location.
    #[arg(long, value_enum, value_name = "STYLE")]
    pub routing: Option<RoutingArg>,

    /// Quiet period after the last edit before the buffer is recompiled.
    #[arg(long, value_name = "MILLISECONDS")]
    pub debounce_ms: Option<u64>,

    /// File mirrored with the current shader source and watched for edits.
    #[arg(long, value_name = "FILE")]
    pub editor_buffer: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Start with the vim key bindings (`h`/`l`) enabled.
    #[arg(long)]
    pub vim: bool,

    /// Configuration file; defaults to `gallery.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "SHADER_GALLERY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the sorted shader listing of a gallery and exit.
    List(ListArgs),
    /// Compile a fragment shader without opening a window.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Gallery root; falls back to the configured source.
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    #[arg(long, value_enum, value_name = "KIND")]
    pub listing: Option<ListingArg>,

    #[arg(long, value_name = "FILE", env = "SHADER_GALLERY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Fragment shader to compile.
    #[arg(value_name = "FILE")]
    pub fragment: PathBuf,

    /// Vertex shader to pair it with; the built-in quad shader otherwise.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListingArg {
    /// Scrape the HTML directory index.
    Index,
    /// Read `manifest.json`.
    Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoutingArg {
    /// `<origin>/<name>`
    Path,
    /// `<page>#<name>`
    Hash,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 640 X 480 "), Ok((640, 480)));
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("widex720").is_err());
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "shader-gallery",
            "http://localhost:8000/",
            "--route",
            "#waves",
            "--listing",
            "manifest",
            "--routing",
            "hash",
            "--debounce-ms",
            "250",
            "--size",
            "800x600",
            "--vim",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        let run = cli.run;
        assert_eq!(run.source.as_deref(), Some("http://localhost:8000/"));
        assert_eq!(run.route.as_deref(), Some("#waves"));
        assert_eq!(run.listing, Some(ListingArg::Manifest));
        assert_eq!(run.routing, Some(RoutingArg::Hash));
        assert_eq!(run.debounce_ms, Some(250));
        assert_eq!(run.size, Some((800, 600)));
        assert!(run.vim);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["shader-gallery", "check", "frag.glsl", "--vertex", "v.glsl"])
            .unwrap();
        match cli.command {
            Some(Command::Check(args)) => {
                assert_eq!(args.fragment, PathBuf::from("frag.glsl"));
                assert_eq!(args.vertex, Some(PathBuf::from("v.glsl")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
