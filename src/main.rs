use anyhow::Result;

use object_detector::config::DetectorConfig;
use object_detector::detection::{DetectOutcome, DetectorSession};
use object_detector::io::camera::OpenCvCamera;
use object_detector::io::highgui::HighGui;
use object_detector::vision::opencv_backend::OpenCvVision;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = DetectorConfig::default();
    let camera = OpenCvCamera::open(config.capture)?;
    let vision = OpenCvVision::new(config.feature_algorithm)?;
    let mut session = DetectorSession::new(camera, HighGui::new(), vision, config);

    session.register()?;

    if let DetectOutcome::Completed(summary) = session.detect()? {
        println!(
            "Processed {} frames, object located in {}",
            summary.frames, summary.frames_located
        );
    }

    session.close()?;
    Ok(())
}
