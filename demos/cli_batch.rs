//! Batch CLI for optic_form_reader
//!
//! Reads every scanned sheet against one template and scores it with a JSON
//! answer key. Scans may be listed one by one or as directories.

use optic_form_reader::image_loader::{is_supported_path, load_image};
use optic_form_reader::{AnswerKey, BatchProcessor, ScannerConfig, Sheet};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        print_help(&args[0]);
        process::exit(1);
    }

    let mut inputs = Vec::new();
    let mut config_path = None;
    let mut json_output = false;
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => match rest.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("Error: --config needs a file argument");
                    process::exit(1);
                }
            },
            "--json" => json_output = true,
            "-h" | "--help" => {
                print_help(&args[0]);
                return;
            }
            _ => inputs.push(PathBuf::from(arg)),
        }
    }

    if inputs.len() < 3 {
        print_help(&args[0]);
        process::exit(1);
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => match ScannerConfig::from_json_file(path) {
            Ok(cfg) => {
                eprintln!("Loaded configuration from {}", path.display());
                cfg
            }
            Err(e) => {
                eprintln!("Error loading config file: {}", e);
                process::exit(1);
            }
        },
        None => ScannerConfig::default(),
    };

    let template = match load_image(&inputs[0]) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error loading template: {}", e);
            process::exit(1);
        }
    };

    let key = match AnswerKey::from_json_file(&inputs[1]) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error loading answer key: {}", e.user_message());
            process::exit(1);
        }
    };
    if key.is_empty() {
        eprintln!("Warning: answer key grades no group, every sheet will score as blank");
    }

    let scan_files = match find_image_files(&inputs[2..]) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error finding image files: {}", e);
            process::exit(1);
        }
    };

    if scan_files.is_empty() {
        eprintln!("No scanned sheets found");
        process::exit(1);
    }

    eprintln!("Found {} scanned sheets to process", scan_files.len());
    eprintln!();

    let mut sheets = Vec::with_capacity(scan_files.len());
    let mut error_count = 0;
    for path in &scan_files {
        let name = display_name(path).to_string();
        match load_image(path) {
            Ok(scan) => sheets.push(Sheet::new(name, scan)),
            Err(e) => {
                eprintln!("✗ {}: {}", name, e);
                error_count += 1;
            }
        }
    }

    let processor = match BatchProcessor::new(&config) {
        Ok(processor) => processor,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let outcomes = match processor.run(&template, &sheets, &key) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Batch aborted: {}", e.user_message());
            process::exit(1);
        }
    };

    let mut success_count = 0;
    for outcome in &outcomes {
        if outcome.is_success() {
            success_count += 1;
        } else {
            error_count += 1;
        }
    }

    if json_output {
        let reports: Vec<_> = outcomes.iter().map(|o| o.report()).collect();
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing results: {}", e);
                process::exit(1);
            }
        }
    } else {
        for outcome in &outcomes {
            println!("{}", outcome);
            println!();
        }
    }

    eprintln!("Batch processing complete:");
    eprintln!("  Success: {}", success_count);
    eprintln!("  Errors: {}", error_count);

    if error_count > 0 {
        process::exit(1);
    }
}

fn print_help(program_name: &str) {
    eprintln!(
        "Usage: {} <template> <answer_key.json> <scan>... [--config cfg.json] [--json]",
        program_name
    );
    eprintln!();
    eprintln!("Read and score scanned optical answer sheets.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  template           Blank template image with the five color zones");
    eprintln!("  answer_key.json    Answers per group, e.g. {{\"A\": \"ABCDE...\", \"B\": \"\"}}");
    eprintln!("  scan               Scanned sheet or directory of scanned sheets");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config FILE      Scanner configuration (see generate_config)");
    eprintln!("  --json             Print results as JSON instead of text");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG=debug     Log every pipeline stage");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} template.png key.json scans/", program_name);
    eprintln!(
        "  {} template.png key.json a.jpg b.jpg --config scanner.json --json",
        program_name
    );
}

fn find_image_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }

        // Directory provided - scan for image files
        let mut found = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && is_supported_path(&path) {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn display_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown")
}
