use std::path::Path;

use rand::{rngs::SmallRng, RngCore, SeedableRng};
use tinyvec::ArrayVec;

use crate::{
    config::Config,
    definitions::{cpu, display, keyboard, memory},
    devices::Keyboard,
    opcode::{self, ChipOpcodes, Opcode, Operation, ProgramCounter, ProgramCounterStep},
    resources::Rom,
    timer::{Cadence, Timer},
    LoadError, OpcodeError, ProcessError, StackError,
};

/// The result of a single scheduler step that did not stop the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The instruction was executed and the program counter advanced.
    Executed {
        /// The sound timer was decremented during this step, a single beep
        /// shall be played.
        beep: bool,
    },
    /// The instruction is waiting for a key press and has to be executed
    /// again, nothing was changed.
    Blocked {
        /// Only ever set if the timers tick while blocked.
        beep: bool,
    },
}

impl Step {
    pub fn beep(&self) -> bool {
        match *self {
            Step::Executed { beep } | Step::Blocked { beep } => beep,
        }
    }
}

/// The ChipSet struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct ChipSet {
    /// name of the loaded rom
    pub(super) name: String,
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x04F` - Used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x050-0x1FF` - Reserved for the interpreter
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Vec<u8>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: u16,
    /// The stack is only used to store return addresses when subroutines are called,
    /// here up to `16` levels of nesting.
    pub(super) stack: ArrayVec<[u16; cpu::stack::SIZE]>,
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read.
    pub(super) delay_timer: Timer,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made.
    pub(super) sound_timer: Timer,
    /// Decides when the timers are decremented.
    pub(super) cadence: Cadence,
    /// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
    /// `(64 x 32)`, stored as rows.
    pub(super) display: Vec<Vec<bool>>,
    /// Set whenever the display changed, cleared once the renderer took it.
    pub(super) dirty: bool,
    pub(super) keyboard: Keyboard,
    /// This stores the random number generator, used by the chipset.
    /// It is stored into the chipset, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
    pub(super) config: Config,
    /// Execution is only possible with a loaded program.
    pub(super) loaded: bool,
}

impl Default for ChipSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipSet {
    /// will create a new chipset object with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// will create a new chipset object, without a loaded program
    pub fn with_config(config: Config) -> Self {
        let rng: Box<dyn RngCore + Send> = match config.rng_seed {
            Some(seed) => Box::new(SmallRng::seed_from_u64(seed)),
            None => Box::new(rand::rngs::OsRng),
        };

        Self {
            name: String::new(),
            opcode: 0,
            memory: initial_memory(),
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            stack: ArrayVec::new(),
            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
            cadence: Cadence::new(config.cycles_per_timer_tick),
            display: vec![vec![false; display::WIDTH]; display::HEIGHT],
            dirty: false,
            keyboard: Keyboard::new(),
            rng,
            config,
            loaded: false,
        }
    }

    /// Brings the chipset back into its initial state, the configuration
    /// and the random number generator are kept.
    pub fn reset(&mut self) {
        self.name.clear();
        self.opcode = 0;
        self.memory = initial_memory();
        self.registers = [0; cpu::register::SIZE];
        self.index_register = 0;
        self.program_counter = cpu::PROGRAM_COUNTER;
        self.stack.clear();
        self.delay_timer = Timer::default();
        self.sound_timer = Timer::default();
        self.cadence.reset();
        self.clear_display();
        self.dirty = false;
        self.keyboard.reset();
        self.loaded = false;
    }

    /// Resets the chipset and writes the rom data into memory at the
    /// program start.
    pub fn load(&mut self, rom: &Rom) {
        self.reset();

        let data = rom.get_data();
        let start = cpu::PROGRAM_COUNTER as usize;
        self.memory[start..(start + data.len())].copy_from_slice(data);

        self.name = rom.get_name().to_string();
        self.loaded = true;
        log::info!("loaded rom '{}' ({} bytes)", self.name, data.len());
    }

    /// Reads the rom from the given path and loads it. On failure the
    /// chipset is left without a loaded program.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        match Rom::from_path(path) {
            Ok(rom) => {
                self.load(&rom);
                Ok(())
            }
            Err(err) => {
                self.loaded = false;
                Err(err)
            }
        }
    }

    /// will get the next opcode from memory
    pub(super) fn set_opcode(&mut self) -> Result<(), OpcodeError> {
        // will build the opcode given from the pointer
        self.opcode = opcode::build_opcode(&self.memory, self.program_counter as usize)?;
        Ok(())
    }

    /// will advance the program by a single step
    ///
    /// An `Err` is fatal, the caller has to stop running the chipset.
    pub fn step(&mut self) -> Result<Step, ProcessError> {
        if !self.loaded {
            log::error!("No rom is loaded!");
            return Err(ProcessError::UninitializedChipset);
        }

        self.set_opcode().map_err(|err| {
            log::error!("{}", err);
            ProcessError::from(err)
        })?;
        log::trace!("{:#06X}\t{:#06X}", self.program_counter, self.opcode);

        let operation = self.calc(self.opcode).map_err(|err| {
            log::error!("{:#06X}\t{:#06X}: {}", self.program_counter, self.opcode, err);
            err
        })?;

        if operation == Operation::Wait {
            let beep = self.config.quirks.timers_tick_while_blocked && self.tick_timers();
            return Ok(Step::Blocked { beep });
        }

        let beep = self.tick_timers();
        Ok(Step::Executed { beep })
    }

    /// Advances the cadence and decrements the timers if they are due.
    /// Returns if a beep shall be played.
    fn tick_timers(&mut self) -> bool {
        if !self.cadence.advance() {
            return false;
        }
        self.delay_timer.decrement();
        let beep = self.sound_timer.decrement();
        if beep {
            log::debug!("beep");
        }
        beep
    }

    /// Will write keyboard data into interncal keyboard representation.
    pub fn set_keyboard(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keyboard.set_mult(keys);
    }

    /// Will set the value of the given key
    pub fn set_key(&mut self, key: usize, to: bool) {
        debug_assert!(key < keyboard::SIZE);
        self.keyboard.set_key(key, to)
    }

    /// Will toggle the given key
    pub fn toggle_key(&mut self, key: usize) {
        self.keyboard.toggle_key(key)
    }

    /// Will get the current state of the keyboard
    pub fn get_keyboard(&self) -> &[bool] {
        self.keyboard.get_keys()
    }

    /// will return the sound timer
    pub fn get_sound_timer(&self) -> u8 {
        self.sound_timer.get_value()
    }

    /// will return the delay timer
    pub fn get_delay_timer(&self) -> u8 {
        self.delay_timer.get_value()
    }

    /// Will return a immutable slice of the current display configuration
    pub fn get_display(&self) -> &[Vec<bool>] {
        &self.display[..]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns if the display changed since the last call and marks it as consumed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn get_registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn get_index_register(&self) -> u16 {
        self.index_register
    }

    pub fn get_program_counter(&self) -> u16 {
        self.program_counter
    }

    /// The return addresses, the last entry is the top of the stack.
    pub fn get_stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn get_memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the random number generator used by `CXNN`.
    pub fn set_rng(&mut self, rng: Box<dyn RngCore + Send>) {
        self.rng = rng;
    }

    pub(super) fn clear_display(&mut self) {
        for row in self.display.iter_mut() {
            for pixel in row.iter_mut() {
                *pixel = false;
            }
        }
    }

    /// Will push the pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: u16) -> Result<(), StackError> {
        if self.stack.len() == self.stack.capacity() {
            Err(StackError::Full)
        } else {
            self.stack.push(pointer);
            Ok(())
        }
    }

    /// Will pop from the stack
    pub(super) fn pop_stack(&mut self) -> Result<u16, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }
}

impl ProgramCounter for ChipSet {
    fn advance(&mut self, step: ProgramCounterStep) {
        self.program_counter = step.apply(self.program_counter);
    }
}

/// zeroed memory with the font set at its location
fn initial_memory() -> Vec<u8> {
    let mut ram = vec![0; memory::SIZE];
    ram[display::fontset::LOCATION
        ..(display::fontset::LOCATION + display::fontset::FONTSET.len())]
        .copy_from_slice(&display::fontset::FONTSET);
    ram
}
