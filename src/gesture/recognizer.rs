//! Landmark classifier
//!
//! Pure function from one hand's landmarks to a [`GestureLabel`]. Anything
//! other than an upright hand reads as `no_hand`.

use super::label::GestureLabel;
use super::landmarks::*;

/// Finger checks in the canonical label order
const FINGERS: [(&str, usize, usize); 4] = [
    ("index", INDEX_TIP, INDEX_PIP),
    ("middle", MIDDLE_TIP, MIDDLE_PIP),
    ("ring", RING_TIP, RING_PIP),
    ("pinky", PINKY_TIP, PINKY_PIP),
];

/// Classify a frame's landmarks
pub fn classify(landmarks: Option<&[Landmark]>) -> Option<GestureLabel> {
    let lm = match landmarks {
        Some(lm) if lm.len() >= LANDMARK_COUNT && points_up(lm) => lm,
        _ => return Some(GestureLabel::no_hand()),
    };

    let mut names: Vec<&str> = Vec::with_capacity(5);
    if thumb_extended(lm) {
        names.push("thumb");
    }
    names.extend(
        FINGERS
            .iter()
            .filter(|(_, tip, pip)| finger_extended(lm, *tip, *pip))
            .map(|(name, _, _)| *name),
    );

    if names.is_empty() {
        return Some(GestureLabel::wake());
    }

    Some(GestureLabel::fingers(names))
}

/// The index finger runs more vertically than horizontally
fn points_up(lm: &[Landmark]) -> bool {
    let dx = (lm[INDEX_MCP].x - lm[INDEX_TIP].x).abs();
    let dy = (lm[INDEX_MCP].y - lm[INDEX_TIP].y).abs();
    dy > dx
}

/// Tip above its PIP joint
fn finger_extended(lm: &[Landmark], tip: usize, pip: usize) -> bool {
    lm[tip].y < lm[pip].y
}

/// Wrist to tip x-deltas all share one strict sign
fn thumb_extended(lm: &[Landmark]) -> bool {
    let deltas = [
        lm[THUMB_TIP].x - lm[THUMB_IP].x,
        lm[THUMB_IP].x - lm[THUMB_MCP].x,
        lm[THUMB_MCP].x - lm[THUMB_CMC].x,
        lm[THUMB_CMC].x - lm[WRIST].x,
    ];
    deltas.iter().all(|d| *d > 0.0) || deltas.iter().all(|d| *d < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(overrides: &[(usize, f32, f32)]) -> Vec<Landmark> {
        let mut lm = vec![Landmark::default(); LANDMARK_COUNT];
        for &(i, x, y) in overrides {
            lm[i] = Landmark::new(x, y);
        }
        lm
    }

    /// Upright fist: every finger folded, thumb zig-zagging
    fn upright_fist() -> Vec<(usize, f32, f32)> {
        vec![
            (INDEX_MCP, 0.5, 0.4),
            (INDEX_PIP, 0.5, 0.6),
            (INDEX_TIP, 0.5, 0.8),
            (MIDDLE_PIP, 0.5, 0.6),
            (MIDDLE_TIP, 0.5, 0.8),
            (RING_PIP, 0.5, 0.6),
            (RING_TIP, 0.5, 0.8),
            (PINKY_PIP, 0.5, 0.6),
            (PINKY_TIP, 0.5, 0.8),
            (WRIST, 0.5, 0.5),
            (THUMB_CMC, 0.6, 0.5),
            (THUMB_MCP, 0.5, 0.5),
            (THUMB_IP, 0.6, 0.5),
            (THUMB_TIP, 0.5, 0.5),
        ]
    }

    fn thumb_right() -> Vec<(usize, f32, f32)> {
        vec![
            (WRIST, 0.3, 0.5),
            (THUMB_CMC, 0.4, 0.5),
            (THUMB_MCP, 0.5, 0.5),
            (THUMB_IP, 0.6, 0.5),
            (THUMB_TIP, 0.7, 0.5),
        ]
    }

    fn with(base: Vec<(usize, f32, f32)>, extra: &[(usize, f32, f32)]) -> Vec<Landmark> {
        let mut all = base;
        all.extend_from_slice(extra);
        hand(&all)
    }

    fn label(lm: &[Landmark]) -> String {
        classify(Some(lm)).unwrap().to_string()
    }

    #[test]
    fn test_missing_landmarks_is_no_hand() {
        assert_eq!(classify(None), Some(GestureLabel::no_hand()));
        assert_eq!(classify(Some(&[])), Some(GestureLabel::no_hand()));
    }

    #[test]
    fn test_partial_hand_is_no_hand() {
        let lm = vec![Landmark::default(); 5];
        assert_eq!(classify(Some(&lm)), Some(GestureLabel::no_hand()));
    }

    #[test]
    fn test_sideways_hand_is_no_hand() {
        let lm = hand(&[(INDEX_MCP, 0.2, 0.5), (INDEX_TIP, 0.8, 0.5)]);
        assert_eq!(label(&lm), "no_hand");
    }

    #[test]
    fn test_upright_fist_is_wake() {
        let lm = hand(&upright_fist());
        assert_eq!(classify(Some(&lm)), Some(GestureLabel::wake()));
    }

    #[test]
    fn test_single_fingers() {
        assert_eq!(
            label(&with(upright_fist(), &[(INDEX_TIP, 0.5, 0.2)])),
            "fingers_extended:index"
        );
        assert_eq!(
            label(&with(upright_fist(), &[(MIDDLE_TIP, 0.5, 0.2)])),
            "fingers_extended:middle"
        );
        assert_eq!(
            label(&with(upright_fist(), &[(RING_TIP, 0.5, 0.2)])),
            "fingers_extended:ring"
        );
        assert_eq!(
            label(&with(upright_fist(), &[(PINKY_TIP, 0.5, 0.2)])),
            "fingers_extended:pinky"
        );
    }

    #[test]
    fn test_index_and_middle() {
        let lm = with(upright_fist(), &[(INDEX_TIP, 0.5, 0.2), (MIDDLE_TIP, 0.5, 0.2)]);
        assert_eq!(label(&lm), "fingers_extended:index+middle");
    }

    #[test]
    fn test_thumb_either_direction() {
        assert_eq!(label(&with(upright_fist(), &thumb_right())), "fingers_extended:thumb");

        let left = [
            (WRIST, 0.7, 0.5),
            (THUMB_CMC, 0.6, 0.5),
            (THUMB_MCP, 0.5, 0.5),
            (THUMB_IP, 0.4, 0.5),
            (THUMB_TIP, 0.3, 0.5),
        ];
        assert_eq!(label(&with(upright_fist(), &left)), "fingers_extended:thumb");
    }

    #[test]
    fn test_open_hand_uses_canonical_order() {
        let mut extra = thumb_right();
        extra.extend_from_slice(&[
            (PINKY_TIP, 0.5, 0.2),
            (RING_TIP, 0.5, 0.2),
            (MIDDLE_TIP, 0.5, 0.2),
            (INDEX_TIP, 0.5, 0.2),
        ]);
        let lm = with(upright_fist(), &extra);
        assert_eq!(label(&lm), "fingers_extended:thumb+index+middle+ring+pinky");
    }

    #[test]
    fn test_thumb_and_pinky() {
        let mut extra = thumb_right();
        extra.push((PINKY_TIP, 0.5, 0.2));
        let lm = with(upright_fist(), &extra);
        assert_eq!(label(&lm), "fingers_extended:thumb+pinky");
    }
}
