/// 手の 21 ランドマークのインデックス（MediaPipe の並び）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandJoint {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandJoint {
    pub const COUNT: usize = 21;

    pub fn from_index(index: usize) -> Option<Self> {
        use HandJoint::*;
        const ALL: [HandJoint; HandJoint::COUNT] = [
            Wrist, ThumbCmc, ThumbMcp, ThumbIp, ThumbTip,
            IndexMcp, IndexPip, IndexDip, IndexTip,
            MiddleMcp, MiddlePip, MiddleDip, MiddleTip,
            RingMcp, RingPip, RingDip, RingTip,
            PinkyMcp, PinkyPip, PinkyDip, PinkyTip,
        ];
        ALL.get(index).copied()
    }
}

/// 掌の中心を近似する 4 点（各指の付け根）
pub const PALM_RING: [HandJoint; 4] = [
    HandJoint::IndexMcp,
    HandJoint::MiddleMcp,
    HandJoint::RingMcp,
    HandJoint::PinkyMcp,
];

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0, 下向きが正)
    pub y: f32,
    /// 奥行きの相対値。モデルが出さない場合は None
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_depth(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// 奥行き（無ければ 0）
    pub fn depth(&self) -> f32 {
        self.z.unwrap_or(0.0)
    }
}

/// 1 フレーム分、片手 21 点のランドマーク
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    landmarks: [Landmark; HandJoint::COUNT],
}

impl LandmarkSet {
    pub fn new(landmarks: [Landmark; HandJoint::COUNT]) -> Self {
        Self { landmarks }
    }

    /// 点数が 21 でなければ手なしとして None
    pub fn from_slice(landmarks: &[Landmark]) -> Option<Self> {
        let landmarks: [Landmark; HandJoint::COUNT] = landmarks.try_into().ok()?;
        Some(Self { landmarks })
    }

    pub fn get(&self, joint: HandJoint) -> &Landmark {
        &self.landmarks[joint as usize]
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// 正規化座標系での単純平均。奥行きは欠損を 0 として平均する
    pub fn average(&self, joints: &[HandJoint]) -> Landmark {
        let count = joints.len().max(1) as f32;
        let (sx, sy, sz) = joints.iter().fold((0.0, 0.0, 0.0), |(sx, sy, sz), &j| {
            let p = self.get(j);
            (sx + p.x, sy + p.y, sz + p.depth())
        });
        Landmark::with_depth(sx / count, sy / count, sz / count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_joint_count() {
        assert_eq!(HandJoint::COUNT, 21);
    }

    #[test]
    fn test_hand_joint_from_index() {
        assert_eq!(HandJoint::from_index(0), Some(HandJoint::Wrist));
        assert_eq!(HandJoint::from_index(9), Some(HandJoint::MiddleMcp));
        assert_eq!(HandJoint::from_index(20), Some(HandJoint::PinkyTip));
        assert_eq!(HandJoint::from_index(21), None);
    }

    #[test]
    fn test_anatomical_indices() {
        assert_eq!(HandJoint::IndexMcp as usize, 5);
        assert_eq!(HandJoint::MiddleMcp as usize, 9);
        assert_eq!(HandJoint::RingMcp as usize, 13);
        assert_eq!(HandJoint::PinkyMcp as usize, 17);
    }

    #[test]
    fn test_depth_defaults_to_zero() {
        assert_eq!(Landmark::new(0.1, 0.2).depth(), 0.0);
        assert_eq!(Landmark::with_depth(0.1, 0.2, -0.3).depth(), -0.3);
    }

    #[test]
    fn test_from_slice_requires_full_hand() {
        let full = vec![Landmark::new(0.5, 0.5); HandJoint::COUNT];
        assert!(LandmarkSet::from_slice(&full).is_some());
        assert!(LandmarkSet::from_slice(&full[..20]).is_none());
        assert!(LandmarkSet::from_slice(&[]).is_none());
    }

    #[test]
    fn test_average_palm_ring() {
        let mut landmarks = [Landmark::default(); HandJoint::COUNT];
        landmarks[HandJoint::IndexMcp as usize] = Landmark::with_depth(0.4, 0.4, 0.1);
        landmarks[HandJoint::MiddleMcp as usize] = Landmark::new(0.5, 0.4);
        landmarks[HandJoint::RingMcp as usize] = Landmark::new(0.6, 0.4);
        landmarks[HandJoint::PinkyMcp as usize] = Landmark::with_depth(0.7, 0.4, 0.3);
        let set = LandmarkSet::new(landmarks);

        let center = set.average(&PALM_RING);
        assert!((center.x - 0.55).abs() < 1e-6);
        assert!((center.y - 0.4).abs() < 1e-6);
        assert!((center.depth() - 0.1).abs() < 1e-6);
    }
}
