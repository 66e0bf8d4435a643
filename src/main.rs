use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use tf_serving_mnist::client::DEFAULT_TIMEOUT;
use tf_serving_mnist::{load_mnist, predict_all, ModelTarget, PredictionClient};

/// Send MNIST test images to a TensorFlow Serving model and print the predicted scores
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Prediction server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Prediction server port
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// MNIST image file (IDX format, optionally gzipped)
    #[arg(long, default_value = "mnist_test_data/t10k-images-idx3-ubyte")]
    images: PathBuf,

    /// MNIST label file (IDX format, optionally gzipped)
    #[arg(long, default_value = "mnist_test_data/t10k-labels-idx1-ubyte")]
    labels: PathBuf,

    /// Only predict the first N images
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    // Load the dataset - a malformed file ends the run here
    let now = Instant::now();
    let dataset = load_mnist(&args.images, &args.labels).with_context(|| {
        format!(
            "Failed to load MNIST data from {} and {}",
            args.images.display(),
            args.labels.display()
        )
    })?;
    log::info!(
        "Loaded {} {}x{} images from {} [{}ms]",
        dataset.len(),
        dataset.rows,
        dataset.cols,
        args.images.display(),
        now.elapsed().as_millis()
    );

    let mut client = PredictionClient::connect(
        &args.host,
        args.port,
        ModelTarget::default(),
        DEFAULT_TIMEOUT,
    )?;
    let target = client.target();
    log::info!(
        "Querying {}:{} for model '{}' v{} (signature '{}')",
        args.host,
        args.port,
        target.name,
        target.version,
        target.signature_name
    );

    let now = Instant::now();
    let summary = predict_all(&mut client, &dataset, args.limit, &mut io::stdout().lock())
        .context("Failed to write predictions")?;
    client.shutdown();

    if summary.skipped() > 0 {
        log::warn!(
            "Predicted {} images, skipped {} ({} conversion failures, {} failed calls) [{}ms]",
            summary.processed,
            summary.skipped(),
            summary.conversion_failures,
            summary.call_failures,
            now.elapsed().as_millis()
        );
    } else {
        log::info!(
            "Predicted {} images [{}ms]",
            summary.processed,
            now.elapsed().as_millis()
        );
    }

    Ok(())
}
