//! Generate a default scanner configuration file
//!
//! Creates a JSON config with all default parameters, ready for tuning

use optic_form_reader::{Region, ScannerConfig};
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_config.json>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} config/scanner.json", args[0]);
        process::exit(1);
    }

    let output_path = Path::new(&args[1]);

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            process::exit(1);
        }
    }

    let config = ScannerConfig::default();

    match config.to_json_file(output_path) {
        Ok(_) => {
            eprintln!("Configuration saved to {}", output_path.display());
            eprintln!();
            eprintln!("Config summary:");
            for region in Region::ALL {
                let range = config.localization.range(region);
                eprintln!(
                    "  {:<15} hue {:>3.0}°-{:>3.0}°{}",
                    region.name(),
                    range.hue_min,
                    range.hue_max,
                    if range.wraps() { " (wraps)" } else { "" }
                );
            }
            eprintln!(
                "  Bubbles: radius {:.0}-{:.0} px, spacing ≥ {:.0} px",
                config.detection.min_radius,
                config.detection.max_radius,
                config.detection.min_center_distance
            );
            eprintln!(
                "  Marks: filled below luminance {:.0}, patch {}x{} px",
                config.classification.intensity_threshold,
                2 * config.classification.patch_half_size,
                2 * config.classification.patch_half_size
            );
        }
        Err(e) => {
            eprintln!("Error saving config: {}", e);
            process::exit(1);
        }
    }
}
