mod charts;
mod dataset;
mod render;
mod report;
mod stats;

use std::path::Path;

// The pipeline runs unconditionally against these fixed filenames, relative
// to the working directory.
const SMART_TV_CSV: &str = "dataset_smart-tv.csv";
const CHROMECAST_CSV: &str = "dataset_chromecast.csv";
const OUTPUT_PDF: &str = "relatorio_final.pdf";

fn main() {
    env_logger::init();
    let result = render::generate_report(
        Path::new(SMART_TV_CSV),
        Path::new(CHROMECAST_CSV),
        Path::new(OUTPUT_PDF),
    );
    match result {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
    }
}
