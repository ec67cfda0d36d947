//! End-to-end checks of the preprocessors through the public API.

use ndarray::{s, Array, Array2, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use topoprep::dataset::DenseDesignMatrix;
use topoprep::preprocessing::{
    ExtractGridPatches, GlobalContrastNormalization, LeCunLcn, Pipeline, PreprocessingError,
    ReassembleGridPatches, RgbYuv,
};
use topoprep::space::{Axes, DefaultViewConverter};

fn random_topo(shape: &[usize], seed: u64) -> ArrayD<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array::from_shape_simple_fn(IxDyn(shape), || rng.sample(StandardNormal))
}

fn random_dataset(shape: &[usize], axes: Axes, seed: u64) -> DenseDesignMatrix {
    DenseDesignMatrix::from_topological_view(random_topo(shape, seed), axes).unwrap()
}

#[test]
fn test_view_round_trip_every_axes_order() {
    let orders = ["b,0,1,c", "b,c,0,1", "c,0,1,b", "0,1,c,b", "1,b,c,0"];
    for (seed, order) in orders.iter().enumerate() {
        let axes: Axes = order.parse().unwrap();
        let converter = DefaultViewConverter::new(vec![3, 4, 2], axes).unwrap();
        let x = random_topo(&[5, converter.num_features()], seed as u64)
            .into_dimensionality::<ndarray::Ix2>()
            .unwrap();

        let topo = converter.design_to_topo(x.view()).unwrap();
        let back = converter.topo_to_design(topo.view()).unwrap();
        assert_eq!(back, x, "axes {}", order);
    }
}

#[test]
fn test_gcn_zero_vector() {
    let mut dataset = DenseDesignMatrix::new(Array2::zeros((1, 1)));
    let gcn = GlobalContrastNormalization::new()
        .with_subtract_mean(true)
        .with_std_bias(0.0)
        .with_use_norm(false);
    dataset.apply_preprocessor(&gcn).unwrap();

    assert!(dataset.design_matrix().iter().all(|&v| v == 0.0));
}

#[test]
fn test_gcn_unit_norm() {
    let mut rng = StdRng::seed_from_u64(0);
    let x = Array2::from_shape_simple_fn((10, 32), || rng.gen_range(-1.0..1.0));
    let mut dataset = DenseDesignMatrix::new(x);

    let gcn = GlobalContrastNormalization::new()
        .with_subtract_mean(false)
        .with_std_bias(0.0)
        .with_use_norm(true);
    dataset.apply_preprocessor(&gcn).unwrap();

    for row in dataset.design_matrix().rows() {
        let norm = row.dot(&row).sqrt();
        assert!((norm - 1.0).abs() < 3e-5, "norm = {}", norm);
    }
}

#[test]
fn test_extract_reassemble() {
    let topo = random_topo(&[4, 3 * 5, 3 * 7, 2], 1);
    let mut dataset = DenseDesignMatrix::from_topological_view(topo.clone(), Axes::default()).unwrap();

    let patch_shape = vec![3, 7];
    dataset
        .apply_preprocessor(&ExtractGridPatches::new(patch_shape.clone(), patch_shape.clone()).unwrap())
        .unwrap();
    dataset
        .apply_preprocessor(&ReassembleGridPatches::new(vec![15, 21], patch_shape).unwrap())
        .unwrap();

    let new_topo = dataset.topological_view().unwrap();
    assert_eq!(new_topo.shape(), topo.shape());
    assert_eq!(new_topo, topo);
}

#[test]
fn test_lecun_lcn() {
    let random = random_topo(&[5, 32, 32, 3], 2);
    let zeros = ArrayD::<f64>::zeros(IxDyn(&[5, 32, 32, 3]));

    for topo in [random, zeros] {
        for channels in [None, Some(vec![1, 2])] {
            let mut dataset = DenseDesignMatrix::from_topological_view(topo.clone(), Axes::default()).unwrap();
            let mut lcn = LeCunLcn::new(vec![32, 32]).unwrap();
            if let Some(channels) = &channels {
                lcn = lcn.with_channels(channels.clone());
            }
            dataset.apply_preprocessor(&lcn).unwrap();

            let out = dataset.topological_view().unwrap();
            assert!(out.iter().all(|v| v.is_finite()));
            if channels.is_some() {
                assert_eq!(out.slice(s![.., .., .., 0]), topo.slice(s![.., .., .., 0]));
            }
        }
    }
}

#[test]
fn test_rgb_yuv() {
    let mut dataset = random_dataset(&[5, 10, 10, 3], Axes::default(), 3);
    dataset.apply_preprocessor(&RgbYuv::new()).unwrap();

    let out = dataset.topological_view().unwrap();
    assert_eq!(out.shape(), &[5, 10, 10, 3]);
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn test_rgb_yuv_inverse() {
    let topo = random_topo(&[5, 10, 10, 3], 4);
    let mut dataset = DenseDesignMatrix::from_topological_view(topo.clone(), Axes::default()).unwrap();

    dataset
        .apply_preprocessor(&Pipeline::new().add(RgbYuv::new()).add(RgbYuv::inverse()))
        .unwrap();

    let out = dataset.topological_view().unwrap();
    let max_err = out
        .iter()
        .zip(topo.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(max_err < 1e-3, "max error {}", max_err);
}

#[test]
fn test_failed_transforms_leave_dataset_untouched() {
    let dataset = random_dataset(&[3, 10, 10, 2], Axes::default(), 5);

    let failures: Vec<(Box<dyn topoprep::Preprocessor>, &str)> = vec![
        (Box::new(ExtractGridPatches::tiling(vec![3, 3]).unwrap()), "non-dividing tiling"),
        (Box::new(ExtractGridPatches::new(vec![11, 2], vec![1, 1]).unwrap()), "patch too large"),
        (Box::new(ReassembleGridPatches::new(vec![20, 20], vec![10, 10]).unwrap()), "incomplete grid"),
        (Box::new(LeCunLcn::new(vec![8, 8]).unwrap()), "img_shape mismatch"),
        (Box::new(RgbYuv::new()), "two channels"),
    ];

    for (preprocessor, label) in failures {
        let mut working = dataset.clone();
        let err = working.apply_preprocessor(preprocessor.as_ref()).unwrap_err();
        assert!(
            matches!(
                err,
                PreprocessingError::Geometry(_) | PreprocessingError::ShapeMismatch { .. }
            ),
            "{}: {}",
            label,
            err
        );
        assert_eq!(working, dataset, "{}", label);
    }
}

#[test]
fn test_nan_input_is_rejected() {
    let mut topo = random_topo(&[2, 4, 4, 3], 6);
    topo[[1, 2, 2, 0]] = f64::NAN;
    let mut dataset = DenseDesignMatrix::from_topological_view(topo, Axes::default()).unwrap();

    let result = dataset.apply_preprocessor(&LeCunLcn::new(vec![4, 4]).unwrap());
    assert!(matches!(result, Err(PreprocessingError::NonFiniteInput(_))));
}
