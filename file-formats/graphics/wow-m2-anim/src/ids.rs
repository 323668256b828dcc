//! Identifiers shared with the outside world: entities, models, render
//! instances, and the semantic ids used to look things up in a skeleton.

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Handle of an entity owned by the external ECS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct EntityId(pub u32);

/// Hash identifying a loaded model (and therefore its skeleton)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ModelIdentity(pub u32);

/// Renderer-side instance id of a drawn model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct InstanceId(pub u32);

/// Opaque reference handed back when a sequence finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct AnimationCallback(pub u64);

/// Semantic animation type (`AnimationData.dbc` id)
pub type AnimationId = u16;

/// Well-known animation ids
pub mod animation_id {
    use super::AnimationId;

    pub const STAND: AnimationId = 0;
    pub const DEATH: AnimationId = 1;
    pub const SPELL: AnimationId = 2;
    pub const STOP: AnimationId = 3;
    pub const WALK: AnimationId = 4;
    pub const RUN: AnimationId = 5;
    pub const DEAD: AnimationId = 6;
    pub const RISE: AnimationId = 7;
    pub const STAND_WOUND: AnimationId = 8;
    pub const COMBAT_WOUND: AnimationId = 9;
    pub const COMBAT_CRITICAL: AnimationId = 10;
    pub const SHUFFLE_LEFT: AnimationId = 11;
    pub const SHUFFLE_RIGHT: AnimationId = 12;
    pub const WALKBACKWARDS: AnimationId = 13;
    pub const STUN: AnimationId = 14;
    pub const HANDS_CLOSED: AnimationId = 15;
    pub const ATTACK_UNARMED: AnimationId = 16;
    pub const JUMP_START: AnimationId = 37;
    pub const JUMP: AnimationId = 38;
    pub const JUMP_END: AnimationId = 39;
    pub const FALL: AnimationId = 40;
    pub const MOUNT: AnimationId = 91;
}

/// Semantic key bones a skeleton may expose
///
/// `Default` is not a real key bone: it stands for the root state slot that
/// drives every bone without a slot of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum KeyBone {
    Default,
    ArmL,
    ArmR,
    ShoulderL,
    ShoulderR,
    SpineLow,
    Waist,
    Head,
    Jaw,
    IndexFingerR,
    MiddleFingerR,
    PinkyFingerR,
    RingFingerR,
    ThumbR,
    IndexFingerL,
    MiddleFingerL,
    PinkyFingerL,
    RingFingerL,
    ThumbL,
    Breath,
    Name,
    NameMount,
    Root,
}

impl KeyBone {
    /// Map an M2 key bone id (`-1` meaning no key bone) to a key bone
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            -1 => Self::Default,
            0 => Self::ArmL,
            1 => Self::ArmR,
            2 => Self::ShoulderL,
            3 => Self::ShoulderR,
            4 => Self::SpineLow,
            5 => Self::Waist,
            6 => Self::Head,
            7 => Self::Jaw,
            8 => Self::IndexFingerR,
            9 => Self::MiddleFingerR,
            10 => Self::PinkyFingerR,
            11 => Self::RingFingerR,
            12 => Self::ThumbR,
            13 => Self::IndexFingerL,
            14 => Self::MiddleFingerL,
            15 => Self::PinkyFingerL,
            16 => Self::RingFingerL,
            17 => Self::ThumbL,
            21 => Self::Breath,
            22 => Self::Name,
            23 => Self::NameMount,
            26 => Self::Root,
            _ => return None,
        })
    }
}

/// Attachment points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum AttachmentType {
    /// Shield, also mount main and item visual 0
    Shield = 0,
    HandRight = 1,
    HandLeft = 2,
    ElbowRight = 3,
    ElbowLeft = 4,
    ShoulderRight = 5,
    ShoulderLeft = 6,
    KneeRight = 7,
    KneeLeft = 8,
    HipRight = 9,
    HipLeft = 10,
    Helm = 11,
    Back = 12,
    ShoulderFlapRight = 13,
    ShoulderFlapLeft = 14,
    ChestBloodFront = 15,
    ChestBloodBack = 16,
    Breath = 17,
    /// Name tag anchor
    PlayerName = 18,
    Base = 19,
    Head = 20,
    SpellLeftHand = 21,
    SpellRightHand = 22,
    Special1 = 23,
    Special2 = 24,
    Special3 = 25,
    SheathMainHand = 26,
    SheathOffHand = 27,
    SheathShield = 28,
    /// Name tag anchor while mounted
    PlayerNameMounted = 29,
    LargeWeaponLeft = 30,
    LargeWeaponRight = 31,
    HipWeaponLeft = 32,
    HipWeaponRight = 33,
    Chest = 34,
}

impl AttachmentType {
    /// Parse from the attachment id stored in the model
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Shield,
            1 => Self::HandRight,
            2 => Self::HandLeft,
            3 => Self::ElbowRight,
            4 => Self::ElbowLeft,
            5 => Self::ShoulderRight,
            6 => Self::ShoulderLeft,
            7 => Self::KneeRight,
            8 => Self::KneeLeft,
            9 => Self::HipRight,
            10 => Self::HipLeft,
            11 => Self::Helm,
            12 => Self::Back,
            13 => Self::ShoulderFlapRight,
            14 => Self::ShoulderFlapLeft,
            15 => Self::ChestBloodFront,
            16 => Self::ChestBloodBack,
            17 => Self::Breath,
            18 => Self::PlayerName,
            19 => Self::Base,
            20 => Self::Head,
            21 => Self::SpellLeftHand,
            22 => Self::SpellRightHand,
            23 => Self::Special1,
            24 => Self::Special2,
            25 => Self::Special3,
            26 => Self::SheathMainHand,
            27 => Self::SheathOffHand,
            28 => Self::SheathShield,
            29 => Self::PlayerNameMounted,
            30 => Self::LargeWeaponLeft,
            31 => Self::LargeWeaponRight,
            32 => Self::HipWeaponLeft,
            33 => Self::HipWeaponRight,
            34 => Self::Chest,
            _ => return None,
        })
    }
}
