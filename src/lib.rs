//! Matching, sampling and box encoding for region-based object detectors.
//!
//! [`encode`] turns proposals and ground truth boxes into class-slotted
//! regression targets for training, and [`decode`] turns predicted deltas and
//! class scores back into one clipped box per proposal.

pub mod processing;
pub mod rcnn;
pub mod utils;

pub use processing::roi::{apply_nms, sample_rpn_outputs, Detections};
pub use processing::sample::{decode, encode, Decoded, EncodedTargets};
pub use rcnn::config::{RpnConfig, SampleConfig};

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s, Array2, Axis};
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;

    use crate::{decode, encode, SampleConfig};

    #[test]
    fn test_encode_decode_round_trip() {
        let gt_boxes = array![
            [10.0f32, 12.0, 30.0, 35.0, 1.0],
            [40.0, 20.0, 70.0, 45.0, 2.0],
            [15.0, 50.0, 38.0, 80.0, 2.0],
        ];
        let noise = array![
            [1.0f32, -2.0, 2.0, 1.0],
            [-1.0, 0.0, -2.0, 2.0],
            [2.0, 1.0, 0.0, -1.0],
        ];
        let rois = &gt_boxes.slice(s![.., 0..4]) + &noise;
        let config = SampleConfig {
            fg_threshold: 0.5,
            bg_threshold: 0.1,
            rois_per_image: 16,
            fg_fraction: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(5);

        let encoded = encode(gt_boxes.view(), rois.view(), 3, &config, &mut rng).unwrap();
        assert_eq!(encoded.labels, array![1usize, 2, 2]);

        // one-hot scores from the sampled labels
        let mut scores = Array2::<f32>::zeros((3, 3));
        for (mut row, &label) in scores.axis_iter_mut(Axis(0)).zip(encoded.labels.iter()) {
            row[label] = 1.0;
        }

        let decoded = decode(
            encoded.bbox_targets.view(),
            scores.view(),
            encoded.rois.view(),
            100,
            100,
        )
        .unwrap();
        assert_eq!(decoded.classes, encoded.labels);
        assert_abs_diff_eq!(
            decoded.final_boxes,
            gt_boxes.slice(s![.., 0..4]),
            epsilon = 1e-3
        );
    }
}
