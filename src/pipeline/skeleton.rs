use serde::{Deserialize, Serialize};

use super::{
    canvas::Surface,
    detector::{SupportedModel, adjacent_pairs},
};
use crate::types::{Keypoint, Pose};

/// Adjacent keypoint pairs for the MoveNet (COCO) keypoint layout.
pub const MOVENET_ADJACENT_PAIRS: &[(usize, usize)] = &[
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 7),
    (5, 11),
    (6, 8),
    (6, 12),
    (7, 9),
    (8, 10),
    (11, 12),
    (11, 13),
    (12, 14),
    (13, 15),
    (14, 16),
];

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const KEYPOINT_RADIUS: f32 = 5.0;
pub const SKELETON_LINE_WIDTH: f32 = 2.0;
pub const OVERLAY_COLOR: [u8; 4] = [255, 0, 0, 255];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Markers only.
    Keypoints,
    /// Markers plus segments between adjacent keypoints.
    Skeleton,
}

#[derive(Clone, Debug)]
pub struct OverlayStyle {
    pub mode: OverlayMode,
    pub score_threshold: f32,
    pub keypoint_radius: f32,
    pub line_width: f32,
    pub color: [u8; 4],
    pub pairs: &'static [(usize, usize)],
}

impl OverlayStyle {
    pub fn new(mode: OverlayMode, score_threshold: f32) -> Self {
        Self {
            mode,
            score_threshold,
            ..Self::default()
        }
    }

    /// Strictly greater: a keypoint sitting exactly on the threshold is hidden.
    pub fn is_visible(&self, keypoint: &Keypoint) -> bool {
        keypoint.score > self.score_threshold
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            mode: OverlayMode::Skeleton,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            keypoint_radius: KEYPOINT_RADIUS,
            line_width: SKELETON_LINE_WIDTH,
            color: OVERLAY_COLOR,
            pairs: adjacent_pairs(SupportedModel::MoveNet),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlaySummary {
    pub keypoints: usize,
    pub segments: usize,
}

impl std::ops::AddAssign for OverlaySummary {
    fn add_assign(&mut self, rhs: Self) {
        self.keypoints += rhs.keypoints;
        self.segments += rhs.segments;
    }
}

pub fn draw_keypoints<S: Surface + ?Sized>(
    surface: &mut S,
    keypoints: &[Keypoint],
    style: &OverlayStyle,
) -> usize {
    let mut drawn = 0;
    for keypoint in keypoints.iter().filter(|kp| style.is_visible(kp)) {
        surface.fill_circle(keypoint.position(), style.keypoint_radius, style.color);
        drawn += 1;
    }
    drawn
}

pub fn draw_skeleton<S: Surface + ?Sized>(
    surface: &mut S,
    keypoints: &[Keypoint],
    style: &OverlayStyle,
) -> usize {
    let mut drawn = 0;
    for &(a, b) in style.pairs {
        let (Some(ka), Some(kb)) = (keypoints.get(a), keypoints.get(b)) else {
            continue;
        };
        if style.is_visible(ka) && style.is_visible(kb) {
            surface.stroke_line(ka.position(), kb.position(), style.line_width, style.color);
            drawn += 1;
        }
    }
    drawn
}

pub fn draw_poses<S: Surface + ?Sized>(
    surface: &mut S,
    poses: &[Pose],
    style: &OverlayStyle,
) -> OverlaySummary {
    let mut summary = OverlaySummary::default();
    for pose in poses {
        let keypoints = draw_keypoints(surface, &pose.keypoints, style);
        let segments = if style.mode == OverlayMode::Skeleton {
            draw_skeleton(surface, &pose.keypoints, style)
        } else {
            0
        };
        summary += OverlaySummary {
            keypoints,
            segments,
        };
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;

    #[derive(Debug, PartialEq)]
    enum Mark {
        Circle((f32, f32)),
        Line((f32, f32), (f32, f32)),
    }

    #[derive(Default)]
    struct Recorder {
        marks: Vec<Mark>,
    }

    impl Surface for Recorder {
        fn size(&self) -> (u32, u32) {
            (640, 480)
        }

        fn clear(&mut self) {}

        fn draw_frame(&mut self, _frame: &Frame) {}

        fn fill_circle(&mut self, center: (f32, f32), _radius: f32, _color: [u8; 4]) {
            self.marks.push(Mark::Circle(center));
        }

        fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), _w: f32, _c: [u8; 4]) {
            self.marks.push(Mark::Line(from, to));
        }
    }

    fn full_body(score: f32) -> Vec<Keypoint> {
        (0..17)
            .map(|i| Keypoint::new(i as f32 * 10.0, i as f32 * 5.0, score))
            .collect()
    }

    #[test]
    fn threshold_is_strict() {
        let style = OverlayStyle::default();
        let keypoints = [
            Keypoint::new(1.0, 1.0, 0.5),
            Keypoint::new(2.0, 2.0, 0.500_001),
            Keypoint::new(3.0, 3.0, 0.0),
            Keypoint::new(4.0, 4.0, 1.0),
        ];
        let mut surface = Recorder::default();
        assert_eq!(draw_keypoints(&mut surface, &keypoints, &style), 2);
        assert_eq!(
            surface.marks,
            vec![Mark::Circle((2.0, 2.0)), Mark::Circle((4.0, 4.0))]
        );
    }

    #[test]
    fn segment_needs_both_endpoints_visible() {
        let style = OverlayStyle::default();
        let mut keypoints = full_body(0.9);
        keypoints[0].score = 0.5;

        let mut surface = Recorder::default();
        let drawn = draw_skeleton(&mut surface, &keypoints, &style);
        // Pairs touching the nose are (0,1) and (0,2).
        assert_eq!(drawn, MOVENET_ADJACENT_PAIRS.len() - 2);
        let nose = keypoints[0].position();
        assert!(surface.marks.iter().all(|mark| match mark {
            Mark::Line(a, b) => *a != nose && *b != nose,
            Mark::Circle(_) => false,
        }));
    }

    #[test]
    fn missing_keypoints_are_ignored() {
        let style = OverlayStyle::default();
        let keypoints = full_body(0.9)[..6].to_vec();
        let mut surface = Recorder::default();
        let drawn = draw_skeleton(&mut surface, &keypoints, &style);
        // Only pairs among indices 0..=5: (0,1) (0,2) (1,3) (2,4).
        assert_eq!(drawn, 4);
    }

    #[test]
    fn keypoints_mode_draws_no_segments() {
        let style = OverlayStyle::new(OverlayMode::Keypoints, 0.5);
        let poses = [Pose::from_keypoints(full_body(0.9))];
        let mut surface = Recorder::default();
        let summary = draw_poses(&mut surface, &poses, &style);
        assert_eq!(summary, OverlaySummary { keypoints: 17, segments: 0 });
        assert!(surface.marks.iter().all(|m| matches!(m, Mark::Circle(_))));
    }

    #[test]
    fn skeleton_mode_draws_markers_before_segments() {
        let style = OverlayStyle::default();
        let poses = [Pose::from_keypoints(full_body(0.9))];
        let mut surface = Recorder::default();
        let summary = draw_poses(&mut surface, &poses, &style);
        assert_eq!(
            summary,
            OverlaySummary {
                keypoints: 17,
                segments: MOVENET_ADJACENT_PAIRS.len()
            }
        );
        assert!(matches!(surface.marks[16], Mark::Circle(_)));
        assert!(matches!(surface.marks[17], Mark::Line(_, _)));
    }

    #[test]
    fn every_pose_is_drawn() {
        let style = OverlayStyle::new(OverlayMode::Keypoints, 0.5);
        let poses = [
            Pose::from_keypoints(vec![Keypoint::new(1.0, 1.0, 0.9)]),
            Pose::from_keypoints(vec![Keypoint::new(2.0, 2.0, 0.9)]),
        ];
        let mut surface = Recorder::default();
        assert_eq!(draw_poses(&mut surface, &poses, &style).keypoints, 2);
    }

    #[test]
    fn summaries_accumulate_across_poses() {
        let style = OverlayStyle::default();
        let poses = [
            Pose::from_keypoints(full_body(0.9)),
            Pose::from_keypoints(full_body(0.9)[..3].to_vec()),
        ];
        let mut surface = Recorder::default();
        let summary = draw_poses(&mut surface, &poses, &style);
        // The partial pose contributes (0,1) and (0,2) only.
        assert_eq!(
            summary,
            OverlaySummary {
                keypoints: 20,
                segments: MOVENET_ADJACENT_PAIRS.len() + 2
            }
        );
    }

    #[test]
    fn default_style_uses_movenet_lookup() {
        let style = OverlayStyle::default();
        assert_eq!(style.pairs, adjacent_pairs(SupportedModel::MoveNet));
        assert_eq!(OverlayStyle::new(OverlayMode::Keypoints, 0.3).pairs, style.pairs);
    }

    #[test]
    fn pairs_reference_valid_movenet_indices() {
        for &(a, b) in MOVENET_ADJACENT_PAIRS {
            assert!(a < 17 && b < 17 && a != b);
        }
        assert_eq!(MOVENET_ADJACENT_PAIRS.len(), 16);
    }
}
