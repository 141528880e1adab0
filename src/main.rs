use std::process::ExitCode;

use cellcounter_core::{export, ResultTable, Session};
use cellcounter_cv::{BlobDetector, DetectionAdapter, ImageUtils};

/// Count cells in the given chamber images and print a CSV result table.
///
/// Usage: cellcounter <image> [<image>...]
fn main() -> ExitCode {
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: cellcounter <image> [<image>...]");
        return ExitCode::FAILURE;
    }

    match run(&paths) {
        Ok(csv) => {
            print!("{csv}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("counting failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(paths: &[String]) -> anyhow::Result<String> {
    let adapter = DetectionAdapter::new(BlobDetector::default());
    let mut sessions = Vec::new();

    for (index, path) in paths.iter().enumerate() {
        let image = ImageUtils::load_grayscale(path)?;
        log::info!("loaded {} ({}x{})", path, image.width(), image.height());

        let mut session = Session::new(format!("tab {}", index + 1));
        session.set_image(path)?;
        session.add_roi(ImageUtils::full_image_roi(&image))?;

        let job = session.begin_detection()?;
        let points = adapter.detect(&image, job.params())?;
        session.apply_detection(&job, points);

        sessions.push(session);
    }

    let refs: Vec<&Session> = sessions.iter().collect();
    Ok(export::to_csv(&ResultTable::from_sessions(&refs)))
}
