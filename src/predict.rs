use std::io::{self, Write};

use crate::client::Predictor;
use crate::mnist::Mnist;
use crate::tensor::image_tensor;

// What happened over one pass through the dataset
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    // Images that produced a printed prediction
    pub processed: usize,
    pub conversion_failures: usize,
    pub call_failures: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.conversion_failures + self.call_failures
    }
}

// Predict every image (or the first `limit`) in order, writing one line per success.
// A failed conversion or call is logged and the image is skipped; only a failure to
// write the output stops the run.
pub fn predict_all<P: Predictor, W: Write>(
    predictor: &mut P,
    dataset: &Mnist,
    limit: Option<usize>,
    out: &mut W,
) -> io::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let n_images = limit.map_or(dataset.len(), |limit| limit.min(dataset.len()));

    for (index, (image, &label)) in dataset
        .images
        .iter()
        .zip(&dataset.labels)
        .take(n_images)
        .enumerate()
    {
        let tensor = match image_tensor(image) {
            Ok(tensor) => tensor,
            Err(e) => {
                log::error!("Create image tensor failed for image {}: {}", index, e);
                summary.conversion_failures += 1;
                continue;
            }
        };

        match predictor.predict(tensor) {
            Ok(scores) => {
                writeln!(out, "label: {}, predicted: {:?}", label, scores)?;
                summary.processed += 1;
            }
            Err(e) => {
                log::error!("Prediction failed for image {}: {}", index, e);
                summary.call_failures += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CallError;
    use crate::mnist::tests::{image_file, label_file};
    use crate::mnist::{parse_images, parse_labels};
    use crate::proto::tensorflow::TensorProto;

    // Returns the first pixel as the only score, failing on the listed calls
    struct Scripted {
        calls: usize,
        fail_on: Vec<usize>,
    }

    impl Scripted {
        fn new(fail_on: &[usize]) -> Self {
            Scripted {
                calls: 0,
                fail_on: fail_on.to_vec(),
            }
        }
    }

    impl Predictor for Scripted {
        fn predict(&mut self, image: TensorProto) -> Result<Vec<f32>, CallError> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                return Err(CallError::Rpc(tonic::Status::deadline_exceeded("timed out")));
            }
            Ok(vec![image.float_val[0]])
        }
    }

    // Ten 1x1 images whose single pixel is 10 * index, labelled 0..=9
    fn ten_images() -> Mnist {
        let pixels: Vec<u8> = (0..10).map(|i| i * 10).collect();
        let labels: Vec<u8> = (0..10).collect();
        let set = parse_images(&image_file(10, 1, 1, &pixels)).unwrap();
        Mnist {
            images: set.images,
            labels: parse_labels(&label_file(&labels)).unwrap(),
            rows: set.rows,
            cols: set.cols,
        }
    }

    fn run(
        predictor: &mut Scripted,
        dataset: &Mnist,
        limit: Option<usize>,
    ) -> (RunSummary, Vec<String>) {
        let mut out = Vec::new();
        let summary = predict_all(predictor, dataset, limit, &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        (summary, lines)
    }

    #[test]
    fn test_one_line_per_image_in_order() {
        let dataset = ten_images();
        let (summary, lines) = run(&mut Scripted::new(&[]), &dataset, None);

        assert_eq!(lines.len(), 10);
        assert_eq!(summary.processed, 10);
        assert_eq!(summary.skipped(), 0);
        assert_eq!(lines[0], "label: 0, predicted: [0.0]");
        assert_eq!(lines[9], "label: 9, predicted: [90.0]");
    }

    #[test]
    fn test_failed_call_is_skipped() {
        let dataset = ten_images();
        let mut predictor = Scripted::new(&[3, 7]);
        let (summary, lines) = run(&mut predictor, &dataset, None);

        // Every image was still attempted
        assert_eq!(predictor.calls, 10);
        assert_eq!(
            summary,
            RunSummary {
                processed: 8,
                conversion_failures: 0,
                call_failures: 2
            }
        );
        let labels: Vec<&str> = lines
            .iter()
            .map(|line| line.split(',').next().unwrap())
            .collect();
        assert_eq!(
            labels,
            [
                "label: 0", "label: 1", "label: 2", "label: 4", "label: 5", "label: 6", "label: 8",
                "label: 9"
            ]
        );
    }

    #[test]
    fn test_bad_image_is_skipped_without_a_call() {
        let mut dataset = ten_images();
        dataset.images[1] = vec![vec![1, 2], vec![3]];
        let mut predictor = Scripted::new(&[]);
        let (summary, lines) = run(&mut predictor, &dataset, None);

        assert_eq!(predictor.calls, 9);
        assert_eq!(summary.conversion_failures, 1);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[1], "label: 2, predicted: [20.0]");
    }

    #[test]
    fn test_limit() {
        let dataset = ten_images();
        let (summary, lines) = run(&mut Scripted::new(&[]), &dataset, Some(3));
        assert_eq!(summary.processed, 3);
        assert_eq!(lines.len(), 3);

        let (summary, _) = run(&mut Scripted::new(&[]), &dataset, Some(100));
        assert_eq!(summary.processed, 10);
    }
}
