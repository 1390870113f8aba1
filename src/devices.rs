use hashbrown::HashMap;

use crate::definitions::keyboard;

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will display all from the pixels, the slice contains the rows
    /// of the framebuffer from top to bottom.
    fn display(&mut self, pixels: &[Vec<bool>]);
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for the audio side effects. This is fire and forget,
/// the chipset never waits for the sound to finish.
pub trait SoundCommands {
    /// Plays a single beep.
    fn beep(&mut self);
}

/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    pub fn reset(&mut self) {
        self.keys = [false; keyboard::SIZE];
    }

    pub fn toggle_key(&mut self, key: usize) {
        debug_assert!(key < keyboard::SIZE);
        if let Some(state) = self.keys.get_mut(key) {
            *state = !*state;
        }
    }

    /// Stores the last reported state of the given key, indices outside
    /// of the keyboard are ignored.
    pub fn set_key(&mut self, key: usize, to: bool) {
        debug_assert!(key < keyboard::SIZE);
        if let Some(state) = self.keys.get_mut(key) {
            *state = to;
        }
    }

    /// Replaces the state of every key at once.
    pub fn set_mult(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keys = *keys;
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }

    /// Returns the state of the key, if the key exists.
    pub fn is_pressed(&self, key: usize) -> Option<bool> {
        self.keys.get(key).copied()
    }

    /// Scans all the keys, if multiple keys are pressed the one with
    /// the highest index wins.
    ///
    /// # Example
    /// ```rust
    /// # use chip::devices::Keyboard;
    /// let mut keyboard = Keyboard::new();
    /// assert_eq!(keyboard.last_pressed(), None);
    /// keyboard.set_key(0x3, true);
    /// keyboard.set_key(0xA, true);
    /// assert_eq!(keyboard.last_pressed(), Some(0xA));
    /// ```
    pub fn last_pressed(&self) -> Option<usize> {
        self.keys.iter().rposition(|pressed| *pressed)
    }
}

/// Maps the keys of the host to the key indices of the chipset.
///
/// ```text
/// +-+-+-+-+  ===  +-+-+-+-+
/// |1|2|3|C|       |1|2|3|4|
/// |4|5|6|D|       |Q|W|E|R|
/// |7|8|9|E|       |A|S|D|F|
/// |A|0|B|F|       |Z|X|C|V|
/// ```
#[derive(Debug, Clone)]
pub struct KeyMapper {
    mapping: HashMap<char, usize>,
}

impl Default for KeyMapper {
    fn default() -> Self {
        Self::with_layout(&keyboard::HOST_LAYOUT)
    }
}

impl KeyMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper that places the given host keys on the same grid
    /// as the chip keyboard layout.
    pub fn with_layout(layout: &[[char; 4]; 4]) -> Self {
        let mapping = layout
            .iter()
            .flatten()
            .zip(keyboard::LAYOUT.iter().flatten())
            .map(|(host, key)| (host.to_ascii_lowercase(), *key))
            .collect();
        Self { mapping }
    }

    /// Returns the key index of the host key, characters without a mapping
    /// are rejected.
    ///
    /// # Example
    /// ```rust
    /// # use chip::devices::KeyMapper;
    /// let mapper = KeyMapper::new();
    /// assert_eq!(mapper.map('x'), Some(0x0));
    /// assert_eq!(mapper.map('V'), Some(0xF));
    /// assert_eq!(mapper.map('p'), None);
    /// ```
    pub fn map(&self, host: char) -> Option<usize> {
        self.mapping.get(&host.to_ascii_lowercase()).copied()
    }

    /// Builds a full keyboard state from the pressed host keys.
    pub fn keyboard<I>(&self, pressed: I) -> [bool; keyboard::SIZE]
    where
        I: IntoIterator<Item = char>,
    {
        let mut keys = [false; keyboard::SIZE];
        for key in pressed.into_iter().filter_map(|host| self.map(host)) {
            keys[key] = true;
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_key_keeps_others() {
        let mut keyboard = Keyboard::new();
        keyboard.set_key(0x1, true);
        keyboard.set_key(0x2, true);
        keyboard.set_key(0x1, false);

        assert_eq!(keyboard.is_pressed(0x1), Some(false));
        assert_eq!(keyboard.is_pressed(0x2), Some(true));
        assert_eq!(keyboard.is_pressed(0x10), None);
    }

    #[test]
    fn test_toggle_key() {
        let mut keyboard = Keyboard::new();
        keyboard.toggle_key(0x4);
        assert_eq!(keyboard.last_pressed(), Some(0x4));
        keyboard.toggle_key(0x4);
        assert_eq!(keyboard.last_pressed(), None);
    }

    #[test]
    fn test_set_mult_and_reset() {
        let mut keyboard = Keyboard::new();
        let mut keys = [false; keyboard::SIZE];
        keys[0x7] = true;
        keys[0xB] = true;
        keyboard.set_mult(&keys);
        assert_eq!(keyboard.get_keys(), &keys);
        assert_eq!(keyboard.last_pressed(), Some(0xB));

        keyboard.reset();
        assert_eq!(keyboard.get_keys(), &[false; keyboard::SIZE]);
    }

    #[test]
    fn test_mapper_covers_every_key() {
        let mapper = KeyMapper::new();
        let mut seen = [false; keyboard::SIZE];
        for host in keyboard::HOST_LAYOUT.iter().flatten() {
            let key = mapper.map(*host).expect("every host key is mapped");
            seen[key] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_mapper_keyboard() {
        let mapper = KeyMapper::new();
        let keys = mapper.keyboard("1Zp".chars());
        let pressed: Vec<usize> = (0..keyboard::SIZE).filter(|k| keys[*k]).collect();
        assert_eq!(pressed, vec![0x1, 0xA]);
    }
}
