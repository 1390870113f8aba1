use thiserror::Error;

use crate::opcode::Opcode;

/// Any error raised while executing an instruction. All of them are fatal
/// for the current run, the machine has to be reset or reloaded afterwards.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("Accessing the font out of bounds at {location:#06X}.")]
    FontOutOfBounds { location: usize },
    #[error("There is no valid chipset initialized.")]
    UninitializedChipset,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
    #[error("Pointer location invalid there can not be an opcode at {pointer}, if data len is {len}")]
    MemoryInvalid { pointer: usize, len: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
}

/// Errors raised while installing a program image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("The rom '{0}' does not contain any data.")]
    Empty(String),
    #[error("The rom is {size} bytes long, but only {max} bytes are available.")]
    TooLarge { size: usize, max: usize },
    #[error("Unable to read the rom: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to extract the rom from the archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Errors raised while installing the logger.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Unable to open the log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("A logger is already installed.")]
    AlreadyInstalled,
}

impl From<log::SetLoggerError> for LoggerError {
    fn from(_: log::SetLoggerError) -> Self {
        LoggerError::AlreadyInstalled
    }
}
