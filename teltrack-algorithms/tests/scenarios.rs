#![allow(clippy::cast_precision_loss, clippy::float_cmp)]
use approx::assert_abs_diff_eq;
use teltrack_algorithms::{
    curvature_step, Arm, Cuts, EventHeader, HistogramCollector, Hit, NullSink, TrackReconstructor,
    TrackingConfig, Xy,
};

const PLANE_Z: [f64; 6] = [0.0, 150.0, 300.0, 450.0, 600.0, 750.0];

// Straight line through (x0, y0) at z = 0
fn straight_track(x0: f64, y0: f64, slope: Xy) -> Vec<Hit> {
    PLANE_Z
        .iter()
        .enumerate()
        .map(|(plane, &z)| Hit::new(plane as u32, x0 + slope.x * z, y0 + slope.y * z, z))
        .collect()
}

// Straight line through (0, 0) at z = 375, the mean z of the two triplets
fn crossing_track(slope: Xy) -> Vec<Hit> {
    straight_track(-375.0 * slope.x, -375.0 * slope.y, slope)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn single_track_gives_one_segment() {
    init_logger();
    let hits = straight_track(0.3, -0.2, Xy::new(0.001, -0.0005));
    let reconstructor = TrackReconstructor::new(TrackingConfig::default());
    let mut state = reconstructor.create_state();

    let result = reconstructor.reconstruct(EventHeader::new(1, 1), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.statistics.ambiguous_triplets, 0);
    assert_eq!(result.statistics.triplets, [1, 1]);
    assert_eq!(result.segments[0].hits.map(|h| h.plane), [0, 1, 2, 3, 4, 5]);
}

#[test]
fn segment_reproduces_straight_track_hits() {
    let hits = straight_track(1.5, 2.5, Xy::new(-0.002, 0.0015));
    let reconstructor = TrackReconstructor::new(TrackingConfig::default());
    let mut state = reconstructor.create_state();

    let result = reconstructor.reconstruct(EventHeader::new(1, 1), &hits, &mut state, &mut NullSink);
    let segment = &result.segments[0];

    for hit in &hits {
        let at = segment.extrapolate(hit.z());
        assert_abs_diff_eq!(at.x, hit.x(), epsilon = 1e-9);
        assert_abs_diff_eq!(at.y, hit.y(), epsilon = 1e-9);
    }
    assert_eq!(segment.curvature, Xy::ZERO);
}

#[test]
fn two_separated_tracks_give_two_segments() {
    let mut hits = straight_track(0.0, 0.0, Xy::new(0.001, 0.0));
    hits.extend(straight_track(10.0, 5.0, Xy::new(-0.001, 0.0005)));
    let reconstructor = TrackReconstructor::new(TrackingConfig::default());
    let mut state = reconstructor.create_state();

    let result = reconstructor.reconstruct(EventHeader::new(1, 2), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 2);
    assert_eq!(result.statistics.ambiguous_triplets, 0);
    let starts: Vec<f64> = result.segments.iter().map(|s| s.hits[0].x()).collect();
    assert_eq!(starts, vec![0.0, 10.0]);
}

#[test]
fn tracks_coinciding_at_mean_z_are_dropped() {
    let mut hits = crossing_track(Xy::new(0.001, 0.0));
    hits.extend(crossing_track(Xy::new(0.002, 0.0)));
    let cuts = Cuts {
        triplet: Xy::new(0.01, 0.01),
        ..Cuts::default()
    };
    let reconstructor = TrackReconstructor::new(TrackingConfig::default().with_cuts(cuts));
    let mut state = reconstructor.create_state();

    let result = reconstructor.reconstruct(EventHeader::new(1, 3), &hits, &mut state, &mut NullSink);

    assert_eq!(result.statistics.triplets, [2, 2]);
    assert_eq!(result.statistics.candidate_pairs, 4);
    assert_eq!(state.candidates().len(), 4);
    assert!(result.segments.is_empty());
    assert_eq!(result.statistics.ambiguous_triplets, 4);
    for arm in Arm::ALL {
        assert!(state.triplets(arm).iter().all(|t| t.match_count == 2));
    }
}

#[test]
fn kink_between_arms_gives_closed_form_step() {
    // Straight arms with a slope kink, field on, no initial curvature
    let bfac = Xy::new(0.5, 0.25);
    let upstream_slope = Xy::new(0.001, -0.0004);
    let downstream_slope = Xy::new(0.0015, -0.0001);

    let up = crossing_track(upstream_slope);
    let down = crossing_track(downstream_slope);
    let mut hits: Vec<Hit> = up[..3].to_vec();
    hits.extend_from_slice(&down[3..]);

    let config = TrackingConfig::default().with_bfac(bfac);
    let reconstructor = TrackReconstructor::new(config);
    let mut state = reconstructor.create_state();
    let mut sink = HistogramCollector::new();

    let result = reconstructor.reconstruct(EventHeader::new(1, 4), &hits, &mut state, &mut sink);
    assert_eq!(result.segments.len(), 1);

    let kink = upstream_slope - downstream_slope;
    let der = Xy::new(bfac.x * (150.0 - 600.0), bfac.y * (150.0 - 600.0));
    let expected = (der.x * kink.x + der.y * kink.y) / (der.x * der.x + der.y * der.y);

    let t0 = &state.triplets(Arm::Upstream)[0];
    let t1 = &state.triplets(Arm::Downstream)[0];
    let dqbyp = curvature_step(bfac, t0.position.z, t1.position.z, t0.slope - t1.slope);
    assert_abs_diff_eq!(dqbyp, expected, epsilon = 1e-12);

    let curvature = result.segments[0].curvature;
    assert_abs_diff_eq!(curvature.x, expected * bfac.x, epsilon = 1e-12);
    assert_abs_diff_eq!(curvature.y, expected * bfac.y, epsilon = 1e-12);
    assert_eq!(sink.entries("segment_dqbyp"), 1);
}

#[test]
fn refinement_recovers_parabolic_curvature() {
    // Hits on x = 0.5 * c * z^2 with c = 3e-6, assumed curvature 2e-6
    let true_curvature = 3e-6;
    let hits: Vec<Hit> = PLANE_Z
        .iter()
        .enumerate()
        .map(|(plane, &z)| Hit::new(plane as u32, 0.5 * true_curvature * z * z, 0.0, z))
        .collect();

    let config = TrackingConfig::default()
        .with_qbyp(1.0)
        .with_bfac(Xy::new(2e-6, 0.0))
        .with_z_mag(0.0);
    let reconstructor = TrackReconstructor::new(config);
    let mut state = reconstructor.create_state();

    let result = reconstructor.reconstruct(EventHeader::new(1, 5), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 1);
    assert_abs_diff_eq!(result.segments[0].curvature.x, true_curvature, epsilon = 1e-12);
    assert_abs_diff_eq!(result.segments[0].curvature.y, 0.0, epsilon = 1e-15);
}

#[test]
fn refinement_is_noop_without_field() {
    let up = crossing_track(Xy::new(0.001, 0.0));
    let down = crossing_track(Xy::new(0.0015, 0.0));
    let mut hits: Vec<Hit> = up[..3].to_vec();
    hits.extend_from_slice(&down[3..]);

    let reconstructor = TrackReconstructor::new(TrackingConfig::default().with_qbyp(0.7));
    let mut state = reconstructor.create_state();
    let result = reconstructor.reconstruct(EventHeader::new(1, 6), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.segments[0].curvature, Xy::ZERO);
}

#[test]
fn dut_hits_attach_only_when_unique() {
    let mut hits = straight_track(0.0, 0.0, Xy::new(0.001, 0.0));
    hits.extend(straight_track(10.0, 0.0, Xy::new(0.001, 0.0)));
    hits.extend(straight_track(20.0, 0.0, Xy::new(0.001, 0.0)));
    // Plane 6 at z = 1000: close to the first track only
    hits.push(Hit::new(6, 1.02, 0.01, 1000.0));
    // Plane 7 at z = 1000: halfway between the second and third tracks
    hits.push(Hit::new(7, 16.0, 0.0, 1000.0));

    let cuts = Cuts::default().with_dut(Xy::new(6.0, 6.0));
    let reconstructor = TrackReconstructor::new(TrackingConfig::default().with_cuts(cuts));
    let mut state = reconstructor.create_state();
    let result = reconstructor.reconstruct(EventHeader::new(1, 7), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 3);
    let first: Vec<u32> = result.segments[0].dut_hits.iter().map(|h| h.plane).collect();
    assert_eq!(first, vec![6]);
    assert!(result.segments[1].dut_hits.is_empty());
    assert!(result.segments[2].dut_hits.is_empty());
    assert_eq!(result.statistics.dut_candidates, 3);
    assert_eq!(result.statistics.dut_hits_attached, 1);
}

#[test]
fn dut_candidates_on_two_planes_attach_nothing() {
    let mut hits = straight_track(0.0, 0.0, Xy::ZERO);
    hits.push(Hit::new(6, 0.01, 0.0, 900.0));
    hits.push(Hit::new(7, 0.01, 0.0, 1000.0));

    let cuts = Cuts::default().with_dut(Xy::new(0.1, 0.1));
    let reconstructor = TrackReconstructor::new(TrackingConfig::default().with_cuts(cuts));
    let mut state = reconstructor.create_state();
    let result = reconstructor.reconstruct(EventHeader::new(1, 8), &hits, &mut state, &mut NullSink);

    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.segments[0].dut_hits.len(), 0);
    assert_eq!(result.statistics.dut_candidates, 2);
    assert_eq!(result.statistics.dut_hits_attached, 0);
}

#[test]
fn segments_never_share_triplets() {
    // Deterministic pseudo-random tracks, some close enough to be ambiguous
    let mut seed = 0x2545_f491_u64;
    let mut next = move || {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (seed >> 11) as f64 / (1u64 << 53) as f64
    };

    let reconstructor = TrackReconstructor::new(TrackingConfig::default());
    let mut state = reconstructor.create_state();

    for event in 0..50u64 {
        let mut hits = Vec::new();
        for _ in 0..4 {
            let x0 = next() * 3.0;
            let y0 = next() * 3.0;
            let slope = Xy::new((next() - 0.5) * 0.004, (next() - 0.5) * 0.004);
            hits.extend(straight_track(x0, y0, slope));
        }

        let result =
            reconstructor.reconstruct(EventHeader::new(2, event), &hits, &mut state, &mut NullSink);

        let mut used = std::collections::HashSet::new();
        for segment in &result.segments {
            assert!(used.insert((0, segment.triplets[0])));
            assert!(used.insert((1, segment.triplets[1])));
            assert_eq!(state.triplets(Arm::Upstream)[segment.triplets[0]].match_count, 1);
            assert_eq!(state.triplets(Arm::Downstream)[segment.triplets[1]].match_count, 1);
        }
    }
}

#[test]
fn monitoring_does_not_change_results() {
    let mut hits = straight_track(0.0, 0.0, Xy::new(0.001, 0.0));
    hits.extend(straight_track(0.5, 0.0, Xy::new(0.001, 0.0)));
    hits.push(Hit::new(6, 1.0, 0.0, 1000.0));
    let config = TrackingConfig::default().with_cuts(Cuts::default().with_dut(Xy::new(0.5, 0.5)));
    let reconstructor = TrackReconstructor::new(config);

    let mut state = reconstructor.create_state();
    let quiet = reconstructor.reconstruct(EventHeader::new(3, 1), &hits, &mut state, &mut NullSink);

    let mut sink = HistogramCollector::new();
    let monitored = reconstructor.reconstruct(EventHeader::new(3, 1), &hits, &mut state, &mut sink);

    assert_eq!(quiet, monitored);
    assert_eq!(sink.entries("arm0_doublet_dx"), 4);
    assert_eq!(sink.entries("triplet_matches"), 4);
}
