use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::error;

use iniread::IniReader;

/// Load an INI file and print its parsed contents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the INI file
    file: PathBuf,

    /// Print a single value instead of the whole table
    #[arg(short, long, value_name = "SECTION.NAME")]
    get: Option<String>,

    /// Fallback printed when the requested value is missing
    #[arg(short, long, value_name = "VALUE", default_value = "")]
    default: String,
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    let reader = match IniReader::from_file(&args.file) {
        Ok(reader) => reader,
        Err(e) => {
            error!("cannot load {}: {}", args.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(lineno) = reader.parse_error() {
        error!("{}: first malformed line is {}", args.file.display(), lineno);
    }

    match args.get {
        Some(ref target) => {
            // A bare name queries the default (unnamed) section.
            let (section, name) = target
                .split_once('.')
                .unwrap_or(("", target.as_str()));
            println!("{}", reader.get(section, name, &args.default));
        }
        None => {
            let mut current: Option<&str> = None;
            for (section, name, value) in reader.entries() {
                if current != Some(section) {
                    if current.is_some() {
                        println!();
                    }
                    if !section.is_empty() {
                        println!("[{section}]");
                    }
                    current = Some(section);
                }
                println!("{name} = {value:?}");
            }
        }
    }

    ExitCode::SUCCESS
}
