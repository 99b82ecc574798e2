//! Basic Agora REPL; single-threaded, persisting its universe as an image.
//!
//! Run with saved state as:       `RUST_LOG=info cargo run --example repl`.
//! Reset saved state and run as:  `RUST_LOG=info cargo run --example repl -- -r`.
//!
//! The image lives in the .gitignore'd demos/images/ directory unless
//! another path is given with `-i`, so state is maintained between
//! executions.

use clap::{App, Arg};
use colored::*;
use log::{info, LevelFilter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use agora::bridge::ClassRegistry;
use agora::error::Error;
use agora::model::AgoraObject;
use agora::syntax::cli_stream::CliStream;
use agora::universe::Universe;
use agora::InitOptions;


fn main() -> Result<(), String> {
    const RELATIVE_IMAGE_PATH: &str = "demos/images/repl.image";
    let base_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    // Setup logging.
    env_logger::Builder::from_default_env()
        .filter_module("rustyline", LevelFilter::Warn)
        .init();

    // Parse args.
    let matches = App::new("Cli Agora REPL")
        .version("0.1")
        .about("Bare-bones single-threaded Agora REPL with persistence")
        .arg(
            Arg::new("reset")
                .short('r')
                .long("reset")
                .help("Discard the saved image"),
        )
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .takes_value(true)
                .help("Image file to resume from and save to"),
        )
        .get_matches();

    let image_path = match matches.value_of("image") {
        Some(path) => PathBuf::from(path),
        None => base_dir.join(RELATIVE_IMAGE_PATH),
    };

    // Perform any needed state preparation.
    if matches.is_present("reset") {
        if let Err(err) = reset_image(&image_path) {
            return Err(format!("Resetting image failed: {}", err));
        }
    }

    // Bootstrap/deserialize.
    let options = InitOptions::Image(image_path.clone());
    let mut universe = match agora::init(options, ClassRegistry::new()) {
        Ok(val) => val,
        Err(err) => return Err(format!("{}", err)),
    };

    // Run.
    for statements in CliStream::new() {
        let result = statements.and_then(|statements| {
            let context = universe.toplevel_context();
            let mut last = universe.nil();
            for statement in statements {
                last = statement.eval(&mut universe, &context)?;
            }
            Ok(last)
        });
        print_result(&universe, &result);
    }

    // Serialize.
    if let Some(dir) = image_path.parent() {
        if let Err(err) = fs::create_dir_all(dir) {
            return Err(err.to_string());
        }
    }
    if let Err(err) = universe.save_image_file(&image_path) {
        return Err(err.to_string());
    }

    Ok(())
}

fn print_result(universe: &Universe, result: &Result<AgoraObject, Error>) {
    match result {
        Ok(val) => match universe.print_string(val) {
            Ok(text) => println!("-> {}", text),
            Err(err) => println!("{}", err.to_string().red()),
        },
        Err(err) => {
            println!("{}", err.to_string().red());
            universe.trace_error(err);
        }
    };
    println!();
}


fn reset_image(image_path: &Path) -> io::Result<()> {
    if image_path.exists() {
        info!("Removing image {}.", image_path.display());
        fs::remove_file(image_path)?;
    }
    Ok(())
}
