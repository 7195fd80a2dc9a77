use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};

use clap::Parser;
use csv2json::{csv_to_json_with_config, flatten, Options, ReaderConfig};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "csv2json", version, about = "Dotted-header CSV to nested JSON converter")]
struct Args {
    /// Input file path (.csv, or JSON with --reverse). Use '-' to read from stdin.
    input: String,

    /// Output file path (prints to stdout if omitted).
    #[arg(short, long, value_name = "file")]
    output: Option<String>,

    /// Pretty-print each record.
    #[arg(short, long)]
    indent: bool,

    /// Indentation size used with --indent (default: 4).
    #[arg(long, value_name = "number", default_value_t = 4)]
    indent_size: usize,

    /// Flatten JSON documents into dotted headers and values instead.
    #[arg(short, long)]
    reverse: bool,

    /// JSON options file keyed by dotted path.
    #[arg(long, value_name = "file")]
    options: Option<String>,

    /// Comma-separated headers; the first input line is then read as data.
    #[arg(long, value_name = "list", value_delimiter = ',')]
    headers: Option<Vec<String>>,

    /// Field delimiter: a single ASCII character, or \\t for tab (default: ,).
    #[arg(long, value_name = "char", value_parser = parse_delimiter, default_value = ",")]
    delimiter: u8,

    /// Strip whitespace around headers and fields.
    #[arg(long)]
    trim: bool,

    /// Report failing rows and continue with the next one.
    #[arg(long)]
    keep_going: bool,
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    RowFailures(u64),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(Outcome::Clean) => {}
        Ok(Outcome::RowFailures(count)) => {
            eprintln!("ERROR  {count} row(s) failed");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("ERROR  {err}");
            std::process::exit(exit_code(err.as_ref()));
        }
    }
}

fn exit_code(err: &(dyn Error + 'static)) -> i32 {
    match err.downcast_ref::<csv2json::Error>() {
        Some(err) if err.is_row_error() => 2,
        _ => 1,
    }
}

fn run() -> Result<Outcome, Box<dyn Error>> {
    let args = Args::parse();
    let input = read_input(&args.input)?;
    let output_target = OutputTarget::from_arg(args.output.as_deref());

    let outcome = if args.reverse {
        with_output_writer(output_target.path(), |writer| run_reverse(writer, input))?;
        Outcome::Clean
    } else {
        let options = load_options(args.options.as_deref())?;
        let mut config = ReaderConfig::new()
            .with_delimiter(args.delimiter)
            .with_trim(args.trim);
        if let Some(headers) = &args.headers {
            config = config.with_headers(headers.iter().cloned());
        }
        with_output_writer(output_target.path(), |writer| {
            run_forward(writer, &args, &config, options, input)
        })?
    };

    if let OutputTarget::File(path) = &output_target {
        report_status(&args.input, path);
    }
    Ok(outcome)
}

fn run_forward(
    writer: &mut dyn Write,
    args: &Args,
    config: &ReaderConfig,
    options: Options,
    input: impl Read,
) -> Result<Outcome, Box<dyn Error>> {
    let indent = args.indent.then_some(args.indent_size);
    let mut failed = 0u64;
    for record in csv_to_json_with_config(input, config, options)? {
        match record {
            Ok(value) => {
                write_json(writer, &value, indent)?;
                writer.write_all(b"\n\n")?;
            }
            Err(err) if args.keep_going && err.is_row_error() => {
                log::warn!("skipping {err}");
                failed += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    writer.flush()?;
    if failed > 0 {
        return Ok(Outcome::RowFailures(failed));
    }
    Ok(Outcome::Clean)
}

fn run_reverse(writer: &mut dyn Write, input: impl Read) -> Result<(), Box<dyn Error>> {
    let documents = serde_json::Deserializer::from_reader(input).into_iter::<Value>();
    for document in documents {
        let flat = flatten(&document?);
        writeln!(writer, "headers: {}", flat.headers_line())?;
        writeln!(writer, "values: {}", flat.values_line())?;
    }
    writer.flush()?;
    Ok(())
}

fn load_options(path: Option<&str>) -> Result<Options, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let file = fs::File::open(path)?;
    let options = Options::from_reader(io::BufReader::new(file))?;
    log::debug!("loaded {} option entries from {path}", options.len());
    Ok(options)
}

/// Opens the input for streaming; rows are converted as they are read.
fn read_input(input: &str) -> Result<Box<dyn Read>, Box<dyn Error>> {
    if input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    Ok(Box::new(io::BufReader::new(fs::File::open(input)?)))
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "\t" => Ok(b'\t'),
        _ if raw.len() == 1 && raw.is_ascii() => Ok(raw.as_bytes()[0]),
        _ => Err(format!(
            "Invalid delimiter \"{raw}\". Use a single ASCII character or \\t for tab"
        )),
    }
}

#[derive(Clone, Debug)]
enum OutputTarget {
    Stdout,
    File(String),
}

impl OutputTarget {
    fn from_arg(output: Option<&str>) -> Self {
        match output {
            Some(path) if path != "-" => OutputTarget::File(path.to_string()),
            _ => OutputTarget::Stdout,
        }
    }

    fn path(&self) -> Option<&str> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path.as_str()),
        }
    }
}

fn with_output_writer<F, T>(path: Option<&str>, f: F) -> Result<T, Box<dyn Error>>
where
    F: FnOnce(&mut dyn Write) -> Result<T, Box<dyn Error>>,
{
    match path {
        Some(path) => {
            let mut file = io::BufWriter::new(fs::File::create(path)?);
            f(&mut file)
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            f(&mut handle)
        }
    }
}

fn write_json(
    writer: &mut dyn Write,
    value: &Value,
    indent: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let Some(indent) = indent else {
        serde_json::to_writer(writer, value)?;
        return Ok(());
    };

    let indent_bytes = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent_bytes);
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

fn report_status(input: &str, output_path: &str) {
    let input_label = if input == "-" { "stdin" } else { input };
    eprintln!("✔ Converted {input_label} → {output_path}");
}
