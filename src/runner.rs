use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    chip8::{ChipSet, Step},
    devices::{DisplayCommands, SoundCommands},
    timer::TimedWorker,
    ProcessError,
};

/// The chipset shared between the clock and the input side.
pub type SharedChipSet = Arc<Mutex<ChipSet>>;

/// Wraps the chipset so it can be shared with the clock.
pub fn share(chip: ChipSet) -> SharedChipSet {
    Arc::new(Mutex::new(chip))
}

/// Runs a single scheduler step and forwards the side effects, the display
/// is only redrawn if the framebuffer changed.
pub fn tick<D, S>(chip: &mut ChipSet, display: &mut D, sound: &mut S) -> Result<Step, ProcessError>
where
    D: DisplayCommands + ?Sized,
    S: SoundCommands + ?Sized,
{
    let step = chip.step()?;

    if chip.take_dirty() {
        display.display(chip.get_display());
    }
    if step.beep() {
        sound.beep();
    }

    Ok(step)
}

/// A running chipset, driven by the worker.
pub struct Runner<W: TimedWorker> {
    worker: W,
    chip: SharedChipSet,
    errors: Receiver<ProcessError>,
}

impl<W: TimedWorker> Runner<W> {
    pub fn chip(&self) -> &SharedChipSet {
        &self.chip
    }

    /// Blocks until the chipset stopped with a fatal error.
    pub fn wait(&self) -> Option<ProcessError> {
        self.errors.recv().ok()
    }

    /// Waits at most the given time for a fatal error.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ProcessError> {
        match self.errors.recv_timeout(timeout) {
            Ok(err) => Some(err),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Reports if the clock is still stepping, it ends on its own after a
    /// fatal error.
    pub fn is_running(&self) -> bool {
        self.worker.is_alive()
    }

    /// Stops the clock, the chipset keeps its current state.
    pub fn stop(mut self) -> SharedChipSet {
        self.worker.stop();
        self.chip
    }
}

/// Starts stepping the chipset once per configured interval. The first
/// fatal error ends the clock and is reported through the runner.
pub fn run<D, S, W>(chip: SharedChipSet, mut display: D, mut sound: S) -> Runner<W>
where
    D: DisplayCommands + Send + 'static,
    S: SoundCommands + Send + 'static,
    W: TimedWorker,
{
    let interval = chip.lock().config().interval();
    let (send, errors) = mpsc::channel();

    let inner_chip = chip.clone();
    let inner_run = move || {
        let mut chip = inner_chip.lock();
        match tick(&mut chip, &mut display, &mut sound) {
            Ok(_) => true,
            Err(err) => {
                log::error!("Stopping execution: {}", err);
                // nobody is listening anymore if the runner is gone
                let _ = send.send(err);
                false
            }
        }
    };

    let mut worker = W::new();
    log::info!("running at an interval of {:?}", interval);
    worker.start(inner_run, interval);

    Runner {
        worker,
        chip,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        devices::{MockDisplayCommands, MockSoundCommands},
        resources::Rom,
        timer::Worker,
        OpcodeError,
    };

    fn chip_with(program: &[u8]) -> ChipSet {
        let mut chip = ChipSet::with_config(Config::default().with_cpu_hertz(1000));
        chip.load(&Rom::new("TEST", program.to_vec()).unwrap());
        chip
    }

    #[test]
    fn test_tick_draws_only_when_dirty() {
        // clear the screen, then loop on a jump
        let mut chip = chip_with(&[0x00, 0xE0, 0x12, 0x02]);
        let mut display = MockDisplayCommands::new();
        display
            .expect_display()
            .withf(|pixels| pixels.len() == 32)
            .times(1)
            .return_const(());
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().times(0);

        for _ in 0..5 {
            assert!(tick(&mut chip, &mut display, &mut sound).is_ok());
        }
    }

    #[test]
    fn test_tick_beeps() {
        // VF = 1, sound timer = VF, loop
        let mut chip = chip_with(&[0x6F, 0x01, 0xFF, 0x18, 0x12, 0x04]);
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(0);
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().times(1).return_const(());

        for _ in 0..30 {
            assert!(tick(&mut chip, &mut display, &mut sound).is_ok());
        }
        assert_eq!(chip.get_sound_timer(), 0);
    }

    #[test]
    fn test_tick_propagates_errors() {
        let mut chip = chip_with(&[0xFF, 0xFF]);
        let mut display = MockDisplayCommands::new();
        let mut sound = MockSoundCommands::new();
        assert_eq!(
            tick(&mut chip, &mut display, &mut sound),
            Err(ProcessError::Opcode(OpcodeError::InvalidOpcode(0xFFFF)))
        );
    }

    #[test]
    fn test_run_reports_fatal_error() {
        // a few valid instructions followed by an invalid one
        let chip = share(chip_with(&[0x60, 0x01, 0x70, 0x01, 0x50, 0x11]));
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(0);
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().times(0);

        let runner: Runner<Worker> = run(chip, display, sound);
        assert_eq!(
            runner.wait(),
            Some(ProcessError::Opcode(OpcodeError::InvalidOpcode(0x5011)))
        );

        // the clock ends by itself
        for _ in 0..200 {
            if !runner.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!runner.is_running());

        let chip = runner.stop();
        let chip = chip.lock();
        assert_eq!(chip.get_registers()[0], 2);
        assert_eq!(chip.get_program_counter(), 0x204);
    }

    #[test]
    fn test_run_and_stop() {
        let chip = share(chip_with(&[0x70, 0x01, 0x12, 0x00]));
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(0);
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().return_const(());

        let runner: Runner<Worker> = run(chip, display, sound);
        assert!(runner.is_running());
        assert_eq!(runner.wait_timeout(Duration::from_millis(50)), None);

        let chip = runner.stop();
        let steps = chip.lock().get_registers()[0];
        assert!(steps > 0);
    }

    #[test]
    fn test_run_ends_clock_on_invalid_opcode() {
        let chip = share(chip_with(&[0xFF, 0xFF]));
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(0);
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().times(0);

        let runner: Runner<Worker> = run(chip, display, sound);
        assert!(runner.wait().is_some());

        std::thread::sleep(Duration::from_millis(50));
        assert!(!runner.is_running());
        // no further error is reported once the clock ended
        assert_eq!(runner.wait(), None);

        let chip = runner.stop();
        assert_eq!(chip.lock().get_program_counter(), 0x200);
    }
}
