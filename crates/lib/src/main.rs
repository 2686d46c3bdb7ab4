use std::{
    fs,
    io::{self, stdout, Write},
    path::{Path, PathBuf},
};

use base64::Engine;
use clap::{builder::PossibleValue, value_parser, Arg, ArgAction, Command, ValueEnum};
use futures::{stream, StreamExt};
use tracing_subscriber::EnvFilter;

use grass_stream::{CompileError, FileRecord, Options, OutputStyle, PluginError};

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Style {
    Expanded,
    Compressed,
}

impl ValueEnum for Style {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Expanded, Self::Compressed]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Expanded => PossibleValue::new("expanded"),
            Self::Compressed => PossibleValue::new("compressed"),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SourceMapMode {
    None,
    Inline,
    External,
}

impl ValueEnum for SourceMapMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::None, Self::Inline, Self::External]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::None => PossibleValue::new("none"),
            Self::Inline => PossibleValue::new("inline"),
            Self::External => PossibleValue::new("external"),
        })
    }
}

fn cli() -> Command {
    Command::new("grass-stream")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile Sass files to CSS through the grass-stream pipeline stage")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .action(ArgAction::Version)
                .long("version")
                .short('v')
                .global(true)
        )
        .arg(
            Arg::new("OUT_DIR")
                .short('o')
                .long("out-dir")
                .help("Directory to write CSS files to. Output goes to stdout when absent.")
                .num_args(1)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("LOAD_PATH")
                .short('I')
                .long("load-path")
                .help("A path to use when resolving imports. May be passed multiple times.")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
        )
        .arg(
            Arg::new("STYLE")
                .short('s')
                .long("style")
                .help("Minified or expanded output")
                .default_value("expanded")
                .ignore_case(true)
                .num_args(1)
                .value_parser(value_parser!(Style)),
        )
        .arg(
            Arg::new("ASYNC")
                .action(ArgAction::SetTrue)
                .long("async")
                .help("Use the compiler's non-blocking entry point"),
        )
        .arg(
            Arg::new("JOBS")
                .short('j')
                .long("jobs")
                .help("How many files may compile at once. Only used with --async.")
                .default_value("1")
                .num_args(1)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("SOURCE_MAP")
                .long("source-map")
                .help("Whether and how to emit source maps")
                .default_value("none")
                .ignore_case(true)
                .num_args(1)
                .value_parser(value_parser!(SourceMapMode)),
        )
        .arg(
            Arg::new("NO_CHARSET")
                .action(ArgAction::SetTrue)
                .long("no-charset")
                .help("Don't emit a @charset or BOM for CSS with non-ASCII characters."),
        )
        .arg(
            Arg::new("QUIET")
                .action(ArgAction::SetTrue)
                .short('q')
                .long("quiet")
                .help("Don't print warnings."),
        )
        .arg(
            Arg::new("INPUT")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append)
                .num_args(1..)
                .required(true)
                .help("Sass files"),
        )
}

#[derive(Debug)]
struct Output {
    out_dir: Option<PathBuf>,
    source_map: SourceMapMode,
}

impl Output {
    fn emit(&self, outcome: Result<FileRecord, PluginError>) -> io::Result<()> {
        let file = outcome.unwrap_or_else(|e| {
            report(&e);
            std::process::exit(1)
        });

        // null records pass through the stage untouched; there is nothing to write
        let Some(css) = file.bytes() else {
            return Ok(());
        };

        let mut css = css.to_vec();

        let map = match (self.source_map, &file.source_map) {
            (SourceMapMode::None, _) | (_, None) => None,
            (_, Some(map)) => Some(
                map.to_json()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            ),
        };

        let Some(out_dir) = &self.out_dir else {
            match (self.source_map, map) {
                (SourceMapMode::Inline, Some(map)) => append_inline(&mut css, &map),
                (SourceMapMode::External, Some(..)) => {
                    tracing::warn!("external source maps need --out-dir; not writing one");
                }
                _ => {}
            }

            let mut stdout = stdout().lock();
            stdout.write_all(&css)?;
            return stdout.flush();
        };

        let dest = out_dir.join(file.relative());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        match (self.source_map, map) {
            (SourceMapMode::Inline, Some(map)) => append_inline(&mut css, &map),
            (SourceMapMode::External, Some(map)) => {
                let map_path = map_path(&dest);
                fs::write(&map_path, map)?;

                if let Some(name) = map_path.file_name() {
                    css.extend_from_slice(
                        format!("\n/*# sourceMappingURL={} */\n", name.to_string_lossy())
                            .as_bytes(),
                    );
                }
            }
            _ => {}
        }

        tracing::debug!(path = %dest.display(), "writing");
        fs::write(dest, css)
    }
}

fn map_path(css_path: &Path) -> PathBuf {
    let mut name = css_path.file_name().unwrap_or_default().to_os_string();
    name.push(".map");
    css_path.with_file_name(name)
}

fn append_inline(css: &mut Vec<u8>, map: &str) {
    let encoded = base64::engine::general_purpose::STANDARD.encode(map);
    css.extend_from_slice(
        format!(
            "\n/*# sourceMappingURL=data:application/json;charset=utf-8;base64,{} */\n",
            encoded
        )
        .as_bytes(),
    );
}

fn report(error: &PluginError) {
    let detail = error
        .compile_error()
        .and_then(CompileError::formatted)
        .map_or_else(|| error.to_string(), str::to_owned);

    match error.file() {
        Some(path) => eprintln!("[{}] {}\n{}", error.plugin(), path.display(), detail),
        None => eprintln!("[{}] {}", error.plugin(), detail),
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();

    let load_paths = matches
        .get_many::<PathBuf>("LOAD_PATH")
        .map_or_else(Vec::new, |vals| vals.cloned().collect());

    let style = match matches.get_one::<Style>("STYLE") {
        Some(Style::Compressed) => OutputStyle::Compressed,
        Some(Style::Expanded) | None => OutputStyle::Expanded,
    };

    let source_map = matches
        .get_one::<SourceMapMode>("SOURCE_MAP")
        .copied()
        .unwrap_or(SourceMapMode::None);

    let options = Options::default()
        .load_paths(&load_paths)
        .style(style)
        .quiet(matches.get_flag("QUIET"))
        .charset(!matches.get_flag("NO_CHARSET"));

    let files = matches
        .get_many::<PathBuf>("INPUT")
        .into_iter()
        .flatten()
        .map(|path| {
            let file = FileRecord::read(path)?;
            Ok(match source_map {
                SourceMapMode::None => file,
                SourceMapMode::Inline | SourceMapMode::External => file.with_source_map(),
            })
        })
        .collect::<io::Result<Vec<_>>>()?;

    let output = Output {
        out_dir: matches.get_one::<PathBuf>("OUT_DIR").cloned(),
        source_map,
    };

    if matches.get_flag("ASYNC") {
        let jobs = matches.get_one::<usize>("JOBS").copied().unwrap_or(1);
        let stage = grass_stream::asynchronous(options).concurrency(jobs);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let mut outcomes = Box::pin(stage.transform(stream::iter(files)));
            while let Some(outcome) = outcomes.next().await {
                output.emit(outcome)?;
            }
            Ok(())
        })
    } else {
        let stage = grass_stream::sync(options);
        let result = stage
            .transform_iter(files)
            .try_for_each(|outcome| output.emit(outcome));
        result
    }
}
