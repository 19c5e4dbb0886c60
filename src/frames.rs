//! Compiled-in animation frames.

/// Columns per frame row, counting the trailing newline.
pub const FRAME_WIDTH: usize = 24;

/// Rows per frame.
pub const FRAME_HEIGHT: usize = 6;

/// Byte length every frame must have.
pub const FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// One still image of the animation, stored as rows joined by newlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    text: &'static str,
}

impl Frame {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &'static str {
        self.text
    }

    /// Byte length of the frame, newlines included.
    pub const fn len(&self) -> usize {
        self.text.len()
    }
}

/// Ordered, immutable sequence of equally sized frames.
#[derive(Debug)]
pub struct FrameSet {
    frames: &'static [Frame],
}

impl FrameSet {
    pub const fn new(frames: &'static [Frame]) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `index`, wrapping around the end of the set.
    pub fn get(&self, index: usize) -> &Frame {
        &self.frames[index % self.frames.len()]
    }

    #[allow(dead_code)] // Used in tests
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Index that follows `index`, wrapping to 0 after the last frame.
    pub fn next_index(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.frames.len() { 0 } else { next }
    }
}

const ROTOR_LEFT: Frame = Frame::new(concat!(
    "ROFL:ROFL:LOL:         \n",
    "      ,____Y____       \n",
    " LOL===       []\\      \n",
    "       \\         \\     \n",
    "        \\________ ]    \n",
    "         __I___I_____/ \n",
));

const ROTOR_RIGHT: Frame = Frame::new(concat!(
    "         :LOL:ROFL:ROFL\n",
    "  L   ,____Y____       \n",
    "  O ===       []\\      \n",
    "  L    \\         \\     \n",
    "        \\________ ]    \n",
    "         __I___I_____/ \n",
));

const ROFLCOPTER_FRAMES: [Frame; 2] = [ROTOR_LEFT, ROTOR_RIGHT];

/// The animation shown by the binary.
pub static ROFLCOPTER: FrameSet = FrameSet::new(&ROFLCOPTER_FRAMES);

const fn all_frames_sized(frames: &[Frame]) -> bool {
    let mut i = 0;
    while i < frames.len() {
        if frames[i].len() != FRAME_SIZE {
            return false;
        }
        i += 1;
    }
    !frames.is_empty()
}

// A frame of the wrong size would leave stale characters behind on redraw.
const _: () = assert!(all_frames_sized(&ROFLCOPTER_FRAMES));
