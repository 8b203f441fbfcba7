//! Benchmarks for center-of-mass estimation and per-frame processing

use com_overlay::{
    annotator::FrameAnnotator,
    center_of_mass::{CenterOfMass, CenterOfMassEstimator},
    constants::{NUM_POSE_LANDMARKS, POSE_MODEL_INPUT_SIZE},
    landmarks::{Landmark, LandmarkAdapter, PoseDetection, PoseKeypoint, PoseLandmark},
    utils::{
        image_conversion::{bgr_to_rgb, letterbox_image, mat_to_nhwc_f32},
        Letterbox,
    },
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use opencv::core::{Mat, Scalar, CV_8UC3};

fn standing_pose() -> PoseDetection {
    let mut keypoints = vec![
        PoseKeypoint {
            point: Landmark::new(0.5, 0.5, 0.0),
            visibility: 0.9,
        };
        NUM_POSE_LANDMARKS
    ];
    let named = [
        (PoseLandmark::Nose, Landmark::new(0.5, 0.1, -0.05)),
        (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.2, 0.0)),
        (PoseLandmark::RightElbow, Landmark::new(0.35, 0.35, 0.02)),
        (PoseLandmark::RightHip, Landmark::new(0.45, 0.5, 0.0)),
        (PoseLandmark::LeftHip, Landmark::new(0.55, 0.5, 0.0)),
        (PoseLandmark::RightKnee, Landmark::new(0.45, 0.8, 0.01)),
    ];
    for (name, point) in named {
        keypoints[name.index()].point = point;
    }
    PoseDetection { keypoints, score: 0.95 }
}

fn benchmark_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimation");

    let detection = standing_pose();
    let adapter = LandmarkAdapter::default();
    let estimator = CenterOfMassEstimator::default();
    let landmarks = adapter.extract(&detection).expect("Reference pose is complete");

    group.bench_function("extract_landmarks", |b| {
        b.iter(|| black_box(adapter.extract(black_box(&detection))));
    });

    group.bench_function("estimate_center_of_mass", |b| {
        b.iter(|| {
            let com = estimator
                .estimate(black_box(&landmarks), black_box(72.5))
                .expect("Estimation failed");
            black_box(com);
        });
    });

    group.finish();
}

fn benchmark_frame_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_processing");

    let frame = Mat::new_rows_cols_with_default(720, 1280, CV_8UC3, Scalar::new(40.0, 80.0, 120.0, 0.0))
        .expect("Failed to create frame");
    let detection = standing_pose();
    let com = CenterOfMass {
        cm_x: 0.5,
        cm_y: 0.47,
        cm_z: 0.0,
    };
    let annotator = FrameAnnotator::default();

    group.bench_function("bgr_to_rgb_720p", |b| {
        b.iter(|| black_box(bgr_to_rgb(black_box(&frame)).expect("Conversion failed")));
    });

    group.bench_function("annotate_720p", |b| {
        b.iter(|| {
            let mut canvas = frame.try_clone().expect("Failed to copy frame");
            annotator
                .annotate(&mut canvas, Some(&detection), Some(&com))
                .expect("Annotation failed");
            black_box(canvas);
        });
    });

    let letterbox = Letterbox::new(1280, 720, POSE_MODEL_INPUT_SIZE).expect("Invalid letterbox");
    group.bench_function("prepare_model_input_720p", |b| {
        b.iter(|| {
            let input = letterbox_image(black_box(&frame), &letterbox).expect("Letterbox failed");
            black_box(mat_to_nhwc_f32(&input).expect("Tensor conversion failed"));
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_estimation, benchmark_frame_processing);
criterion_main!(benches);
