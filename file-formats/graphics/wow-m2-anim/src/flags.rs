//! Flag sets for playback state, bones and sequences

bitflags::bitflags! {
    /// Playback flags of an animation state slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimationFlags: u8 {
        /// Progress does not advance
        const PAUSED = 0x01;
        /// Progress runs from the end of the sequence towards 0
        const PLAY_REVERSED = 0x02;
        /// Stay on the terminal frame instead of looping
        const HOLD_AT_END = 0x04;
        /// Blending towards the queued sequence
        const TRANSITIONING = 0x08;
        /// Current sequence reached its terminal frame
        const FINISHED = 0x10;
        /// Queued sequence interrupts the current one immediately
        const FORCE_TRANSITION = 0x20;
    }
}

impl AnimationFlags {
    /// Flags a caller may request; the rest are runtime bookkeeping
    pub const REQUESTABLE: Self = Self::PAUSED
        .union(Self::PLAY_REVERSED)
        .union(Self::HOLD_AT_END);

    pub fn is_paused(self) -> bool {
        self.contains(Self::PAUSED)
    }

    pub fn is_play_reversed(self) -> bool {
        self.contains(Self::PLAY_REVERSED)
    }

    pub fn is_hold_at_end(self) -> bool {
        self.contains(Self::HOLD_AT_END)
    }

    pub fn is_transitioning(self) -> bool {
        self.contains(Self::TRANSITIONING)
    }

    pub fn is_finished(self) -> bool {
        self.contains(Self::FINISHED)
    }

    pub fn is_force_transition(self) -> bool {
        self.contains(Self::FORCE_TRANSITION)
    }

    pub fn set_paused(&mut self, value: bool) {
        self.set(Self::PAUSED, value);
    }

    pub fn set_transitioning(&mut self, value: bool) {
        self.set(Self::TRANSITIONING, value);
    }

    pub fn set_finished(&mut self, value: bool) {
        self.set(Self::FINISHED, value);
    }

    pub fn set_force_transition(&mut self, value: bool) {
        self.set(Self::FORCE_TRANSITION, value);
    }

    /// Flags carried from a finished sequence to the one that replaces it
    pub fn carried_over(self) -> Self {
        self & Self::REQUESTABLE
    }
}

bitflags::bitflags! {
    /// Bone flags as defined in the M2 format
    ///
    /// Only the animated marker drives the simulation, other bits are kept
    /// as read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoneFlags: u32 {
        /// Bone carries authored animation, not just hierarchy
        const TRANSFORMED = 0x200;
    }
}

impl BoneFlags {
    pub fn is_transformed(self) -> bool {
        self.contains(Self::TRANSFORMED)
    }
}

bitflags::bitflags! {
    /// Sequence flags as defined in the M2 format
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SequenceFlags: u32 {
        /// Set by the client when the sequence is loaded
        const LOADED = 0x1;
        /// Primary bone sequence
        const PRIMARY_BONE_SEQUENCE = 0x20;
        /// Sequence is an alias, follow `alias_next`
        const IS_ALIAS = 0x40;
        /// Blend into this sequence instead of snapping
        const BLEND_TRANSITION = 0x80;
        /// Keyframes stored in the model rather than an external .anim
        const STORED_IN_MODEL = 0x100;
        /// Blend only when another sequence is already playing
        const BLEND_TRANSITION_IF_ACTIVE = 0x800;
    }
}

impl SequenceFlags {
    /// Whether a transition into or out of this sequence should blend
    pub fn blends(self) -> bool {
        self.intersects(Self::BLEND_TRANSITION | Self::BLEND_TRANSITION_IF_ACTIVE)
    }

    /// Whether the sequence only redirects to another one
    pub fn is_alias(self) -> bool {
        self.contains(Self::IS_ALIAS) && !self.contains(Self::PRIMARY_BONE_SEQUENCE)
    }
}
