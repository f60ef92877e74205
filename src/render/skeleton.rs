use crate::hand::HandJoint;

/// 手の骨格の接続定義 (開始ジョイント, 終了ジョイント)
pub const HAND_CONNECTIONS: [(HandJoint, HandJoint); 21] = [
    // 親指
    (HandJoint::Wrist, HandJoint::ThumbCmc),
    (HandJoint::ThumbCmc, HandJoint::ThumbMcp),
    (HandJoint::ThumbMcp, HandJoint::ThumbIp),
    (HandJoint::ThumbIp, HandJoint::ThumbTip),
    // 人差し指
    (HandJoint::Wrist, HandJoint::IndexMcp),
    (HandJoint::IndexMcp, HandJoint::IndexPip),
    (HandJoint::IndexPip, HandJoint::IndexDip),
    (HandJoint::IndexDip, HandJoint::IndexTip),
    // 中指
    (HandJoint::MiddleMcp, HandJoint::MiddlePip),
    (HandJoint::MiddlePip, HandJoint::MiddleDip),
    (HandJoint::MiddleDip, HandJoint::MiddleTip),
    // 薬指
    (HandJoint::RingMcp, HandJoint::RingPip),
    (HandJoint::RingPip, HandJoint::RingDip),
    (HandJoint::RingDip, HandJoint::RingTip),
    // 小指
    (HandJoint::Wrist, HandJoint::PinkyMcp),
    (HandJoint::PinkyMcp, HandJoint::PinkyPip),
    (HandJoint::PinkyPip, HandJoint::PinkyDip),
    (HandJoint::PinkyDip, HandJoint::PinkyTip),
    // 掌
    (HandJoint::IndexMcp, HandJoint::MiddleMcp),
    (HandJoint::MiddleMcp, HandJoint::RingMcp),
    (HandJoint::RingMcp, HandJoint::PinkyMcp),
];

/// ランドマークの色 (RGB)
pub const LANDMARK_COLOR: u32 = 0x00FF00; // 緑

/// 骨格線の色 (RGB)
pub const SKELETON_COLOR: u32 = 0xFFFF00; // 黄色

/// 掌リングの色 (RGB)
pub const PALM_RING_COLOR: u32 = 0x00FFFF;

/// モデルのワイヤーフレームの色 (RGB)
pub const WIREFRAME_COLOR: u32 = 0xFF3366;
