//! Input Capture, Recording and Replay
//!
//! Per-frame input samples, the per-round input history and the
//! last-round replayer.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::state::Side;

/// Maximum frames recorded in one round (5 minutes at 60 Hz).
pub const MAX_RECORDING_FRAMES: usize = 60 * 60 * 5;

// =============================================================================
// INPUT BITS
// =============================================================================

/// Set of pressed buttons for one side in one frame.
///
/// Bit 0 = Left, bit 1 = Right, bit 2 = Attack; 0 = no input.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputBits(pub u8);

impl InputBits {
    /// No button pressed.
    pub const NONE: Self = Self(0);
    /// Left pressed.
    pub const LEFT: Self = Self(0x01);
    /// Right pressed.
    pub const RIGHT: Self = Self(0x02);
    /// Attack pressed.
    pub const ATTACK: Self = Self(0x04);

    const ALL: u8 = 0x07;

    /// Build from raw bits, dropping unknown flags.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    /// Decode a 3-byte action message: {Left, Right, Attack}, nonzero = pressed.
    #[inline]
    pub fn from_action_bytes(bytes: [u8; 3]) -> Self {
        let mut bits = Self::NONE;
        bits.set(Self::LEFT, bytes[0] != 0);
        bits.set(Self::RIGHT, bytes[1] != 0);
        bits.set(Self::ATTACK, bytes[2] != 0);
        bits
    }

    /// Encode as a 3-byte action message.
    #[inline]
    pub fn to_action_bytes(self) -> [u8; 3] {
        [
            self.contains(Self::LEFT) as u8,
            self.contains(Self::RIGHT) as u8,
            self.contains(Self::ATTACK) as u8,
        ]
    }

    /// Raw bit value.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag of `other` is pressed.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Set or clear the given flags.
    #[inline]
    pub fn set(&mut self, flags: Self, pressed: bool) {
        if pressed {
            self.0 |= flags.0;
        } else {
            self.0 &= !flags.0;
        }
    }

    /// Check if no button is pressed.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for InputBits {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for InputBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Input[{}{}{}]",
            if self.contains(Self::LEFT) { "L" } else { "-" },
            if self.contains(Self::RIGHT) { "R" } else { "-" },
            if self.contains(Self::ATTACK) { "A" } else { "-" },
        )
    }
}

// =============================================================================
// INPUT SAMPLE
// =============================================================================

/// One side's input for one frame.
///
/// A `Copy` value: history holds what was pressed at capture time no
/// matter what the source does afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Pressed buttons
    pub input: InputBits,
    /// Seconds since the round's Fight state began
    pub time: f64,
}

impl InputSample {
    /// Create a sample.
    pub const fn new(input: InputBits, time: f64) -> Self {
        Self { input, time }
    }
}

// =============================================================================
// LOCAL INPUT SOURCES
// =============================================================================

/// A local controller polled once per frame.
pub trait InputSource: Send {
    /// Buttons currently held by `side`.
    fn pressed(&mut self, side: Side) -> InputBits;

    /// Whether either side pressed Attack this frame (End-state skip).
    fn attack_pressed_this_frame(&mut self) -> bool {
        false
    }
}

/// Controller that never presses anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn pressed(&mut self, _side: Side) -> InputBits {
        InputBits::NONE
    }
}

/// Controller holding a fixed set of buttons per side.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeldInput {
    held: [InputBits; 2],
    attack_edge: bool,
}

impl HeldInput {
    /// Hold `p1` and `p2` on every frame.
    pub fn new(p1: InputBits, p2: InputBits) -> Self {
        Self { held: [p1, p2], attack_edge: false }
    }

    /// Change what `side` holds. A new Attack press registers as an edge.
    pub fn hold(&mut self, side: Side, input: InputBits) {
        let was_attacking = self.held[side.index()].contains(InputBits::ATTACK);
        if input.contains(InputBits::ATTACK) && !was_attacking {
            self.attack_edge = true;
        }
        self.held[side.index()] = input;
    }
}

impl InputSource for HeldInput {
    fn pressed(&mut self, side: Side) -> InputBits {
        self.held[side.index()]
    }

    fn attack_pressed_this_frame(&mut self) -> bool {
        std::mem::take(&mut self.attack_edge)
    }
}

// =============================================================================
// INPUT HISTORY
// =============================================================================

/// Fixed-capacity per-frame input record for both sides.
///
/// Indexed by frame within the round. Writes past capacity are dropped:
/// a round always ends long before the buffer fills.
#[derive(Clone, Debug)]
pub struct InputHistory {
    p1: Vec<InputSample>,
    p2: Vec<InputSample>,
    capacity: usize,
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::with_capacity(MAX_RECORDING_FRAMES)
    }
}

impl InputHistory {
    /// Create an empty history that keeps at most `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            p1: Vec::with_capacity(capacity),
            p2: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Record both sides' samples for the next frame.
    ///
    /// Returns false (and records nothing) once capacity is reached.
    pub fn record(&mut self, p1: InputSample, p2: InputSample) -> bool {
        if self.p1.len() >= self.capacity {
            return false;
        }
        self.p1.push(p1);
        self.p2.push(p2);
        true
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.p1.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.p1.is_empty()
    }

    /// Maximum number of frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples recorded at `frame`.
    pub fn get(&self, frame: usize) -> Option<(InputSample, InputSample)> {
        Some((*self.p1.get(frame)?, *self.p2.get(frame)?))
    }

    /// Most recently recorded samples.
    pub fn last(&self) -> Option<(InputSample, InputSample)> {
        Some((*self.p1.last()?, *self.p2.last()?))
    }

    /// Reset the write cursor.
    pub fn clear(&mut self) {
        self.p1.clear();
        self.p2.clear();
    }

    /// Overwrite this history with a copy of `other`.
    pub fn copy_from(&mut self, other: &InputHistory) {
        self.p1.clear();
        self.p2.clear();
        self.p1.extend_from_slice(&other.p1);
        self.p2.extend_from_slice(&other.p2);
    }

    /// Hash of the recorded input bits (timestamps excluded).
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_input_history();
        hasher.update_u32(self.len() as u32);
        for (a, b) in self.p1.iter().zip(&self.p2) {
            hasher.update_u8(a.input.bits());
            hasher.update_u8(b.input.bits());
        }
        hasher.finalize()
    }
}

/// Sample at `cursor`, holding at the final recorded frame.
fn held_sample(history: &InputHistory, cursor: usize) -> (InputSample, InputSample) {
    match history.len() {
        0 => (InputSample::default(), InputSample::default()),
        len => history.get(cursor.min(len - 1)).unwrap_or_default(),
    }
}

// =============================================================================
// INPUT RECORDER
// =============================================================================

/// Live recording plus the last round's copy used for replay.
#[derive(Clone, Debug, Default)]
pub struct InputRecorder {
    live: InputHistory,
    last_round: InputHistory,
    replaying: bool,
    replay_cursor: usize,
}

impl InputRecorder {
    /// Create a recorder with the default round capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder with a custom capacity (tests, short rounds).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: InputHistory::with_capacity(capacity),
            last_round: InputHistory::with_capacity(capacity),
            replaying: false,
            replay_cursor: 0,
        }
    }

    /// Record a frame. While replaying, also advances the replay cursor.
    ///
    /// Returns false when the live buffer is full and the frame was dropped.
    pub fn record(&mut self, p1: InputSample, p2: InputSample) -> bool {
        if !self.live.record(p1, p2) {
            return false;
        }
        if self.replaying && self.replay_cursor < self.last_round.len() {
            self.replay_cursor += 1;
        }
        true
    }

    /// Reset the live write cursor (start of a Fight).
    pub fn reset_live(&mut self) {
        self.live.clear();
    }

    /// Copy the live buffer into the last-round buffer and stop replaying.
    pub fn copy_last_round(&mut self) {
        self.last_round.copy_from(&self.live);
        self.replaying = false;
        self.replay_cursor = 0;
    }

    /// Begin feeding last-round samples instead of live input.
    pub fn start_replay(&mut self) {
        self.replaying = true;
        self.replay_cursor = 0;
    }

    /// Whether replay mode is active.
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Current replay cursor.
    pub fn replay_cursor(&self) -> usize {
        self.replay_cursor
    }

    /// Last-round samples at the replay cursor, holding at the final frame.
    pub fn replay_sample(&self) -> (InputSample, InputSample) {
        held_sample(&self.last_round, self.replay_cursor)
    }

    /// Each side's most recently recorded input (NONE before the first frame).
    pub fn most_recent(&self) -> (InputBits, InputBits) {
        self.live
            .last()
            .map(|(a, b)| (a.input, b.input))
            .unwrap_or_default()
    }

    /// Live history of the current round.
    pub fn live(&self) -> &InputHistory {
        &self.live
    }

    /// History copied at the end of the previous round.
    pub fn last_round(&self) -> &InputHistory {
        &self.last_round
    }
}

// =============================================================================
// TESTS
// =============================================================================
