use crate::{
    definitions::{cpu, display, memory},
    opcode::{ChipOpcodes, Opcode, OpcodeTrait, Operation, ProgramCounterStep},
    OpcodeError, ProcessError,
};

use super::ChipSet;

#[inline]
fn err<T>(opcode: Opcode) -> Result<T, ProcessError> {
    Err(OpcodeError::InvalidOpcode(opcode).into())
}

/// Addresses derived from the index register wrap around the end of memory.
#[inline]
fn wrap(address: usize) -> usize {
    address % memory::SIZE
}

impl ChipOpcodes for ChipSet {
    fn zero(&mut self, opcode: Opcode) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        log::debug!("opcode {:#X}", opcode);
        match opcode {
            0x00E0 => {
                // 00E0
                // clear display
                self.clear_display();
                self.dirty = true;
                Ok((ProgramCounterStep::Next, Operation::Draw))
            }
            0x00EE => {
                // 00EE
                // Return from sub routine => pop from stack, the stack holds
                // the address of the call itself
                let pc = self.pop_stack()?;
                log::debug!("pc {:#X}", pc);
                Ok((
                    ProgramCounterStep::Jump(pc.wrapping_add(memory::opcodes::SIZE)),
                    Operation::None,
                ))
            }
            _ => {
                // 0NNN
                // Calls the machine code routine at NNN, there is no machine
                // code here so it's a jump without touching the stack.
                Ok((ProgramCounterStep::Jump(opcode.nnn()), Operation::None))
            }
        }
    }

    fn one(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 1NNN
        // Jumps to address NNN.
        Ok(ProgramCounterStep::Jump(opcode.nnn()))
    }

    fn two(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 2NNN
        // Calls subroutine at NNN
        self.push_stack(self.program_counter)?;
        Ok(ProgramCounterStep::Jump(opcode.nnn()))
    }

    fn three(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 3XNN
        // Skips the next instruction if VX equals NN. (Usually the next instruction is a jump to
        // skip a code block)
        let (x, nn) = opcode.xnn();
        Ok(ProgramCounterStep::cond(self.registers[x] == nn))
    }

    fn four(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 4XNN
        // Skips the next instruction if VX doesn't equal NN.
        let (x, nn) = opcode.xnn();
        Ok(ProgramCounterStep::cond(self.registers[x] != nn))
    }

    fn five(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 5XY0
        // Skips the next instruction if VX equals VY.
        match opcode.xyn() {
            (x, y, 0) => Ok(ProgramCounterStep::cond(
                self.registers[x] == self.registers[y],
            )),
            _ => err(opcode),
        }
    }

    fn six(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 6XNN
        // Sets VX to NN.
        let (x, nn) = opcode.xnn();
        self.registers[x] = nn;
        Ok(ProgramCounterStep::Next)
    }

    fn seven(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 7XNN
        // Adds NN to VX. (Carry flag is not changed)
        let (x, nn) = opcode.xnn();
        self.registers[x] = self.registers[x].wrapping_add(nn);
        Ok(ProgramCounterStep::Next)
    }

    fn eight(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        let (x, y, n) = opcode.xyn();
        let vx = self.registers[x];
        let vy = self.registers[y];
        let shift_flag = self.config.quirks.shift_sets_flag;

        // the flag is written after the result, so VF as the target
        // register ends up holding the flag
        let (res, flag) = match n {
            // 8XY0
            // Sets VX to the value of VY.
            0x0 => (vy, None),
            // 8XY1
            // Sets VX to VX or VY. (Bitwise OR operation)
            0x1 => (vx | vy, None),
            // 8XY2
            // Sets VX to VX and VY. (Bitwise AND operation)
            0x2 => (vx & vy, None),
            // 8XY3
            // Sets VX to VX xor VY.
            0x3 => (vx ^ vy, None),
            0x4 => {
                // 8XY4
                // Adds VY to VX. VF is set to 1 when there's a carry, and to 0 when there isn't.
                let (res, carry) = vx.overflowing_add(vy);
                (res, Some(carry as u8))
            }
            // 8XY5
            // VY is subtracted from VX. VF is set to 0 when there's a borrow, and 1 when there
            // isn't.
            0x5 => (vx.wrapping_sub(vy), Some((vx >= vy) as u8)),
            // 8XY6
            // Shifts VX to the right by 1, the least significant bit only ends up in VF
            // with the shift quirk.
            0x6 => (vx >> 1, if shift_flag { Some(vx & 1) } else { None }),
            // 8XY7
            // Sets VX to VY minus VX. VF is set to 0 when there's a borrow, and 1 when there
            // isn't.
            0x7 => (vy.wrapping_sub(vx), Some((vy >= vx) as u8)),
            // 8XYE
            // Shifts VX to the left by 1, the most significant bit only ends up in VF
            // with the shift quirk.
            0xE => (vx << 1, if shift_flag { Some(vx >> 7) } else { None }),
            _ => return err(opcode),
        };

        self.registers[x] = res;
        if let Some(flag) = flag {
            self.registers[cpu::register::LAST] = flag;
        }
        Ok(ProgramCounterStep::Next)
    }

    fn nine(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // 9XY0
        // Skips the next instruction if VX doesn't equal VY.
        match opcode.xyn() {
            (x, y, 0) => Ok(ProgramCounterStep::cond(
                self.registers[x] != self.registers[y],
            )),
            _ => err(opcode),
        }
    }

    fn a(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // ANNN
        // Sets I to the address NNN.
        self.index_register = opcode.nnn();
        Ok(ProgramCounterStep::Next)
    }

    fn b(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // BNNN
        // Jumps to the address NNN plus V0.
        let v0 = self.registers[0] as u16;
        Ok(ProgramCounterStep::Jump(opcode.nnn() + v0))
    }

    fn c(&mut self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        // CXNN
        // Sets VX to the result of a bitwise and operation on a random number (Typically: 0 to 255)
        // and NN.
        let (x, nn) = opcode.xnn();
        // using a fill bytes call here, as the trait RngCore does not
        // support random u8.
        let mut rand: [u8; 1] = [0];
        self.rng.fill_bytes(&mut rand);
        self.registers[x] = nn & rand[0];
        Ok(ProgramCounterStep::Next)
    }

    fn d(&mut self, opcode: Opcode) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        // DXYN
        // Draws a sprite at coordinate (VX, VY) that has a width of 8 pixels and a height of N
        // pixels. Each row of 8 pixels is read as bit-coded starting from memory location I; I
        // value doesn’t change after the execution of this instruction. VF is set to 1 if any
        // screen pixels are flipped from set to unset when the sprite is drawn, and to 0 if that
        // doesn’t happen.
        // The start position wraps around the screen, the sprite itself is clipped at the edges.
        let (reg_x, reg_y, n) = opcode.xyn();

        let index = self.index_register as usize;
        let coorx = self.registers[reg_x] as usize % display::WIDTH;
        let coory = self.registers[reg_y] as usize % display::HEIGHT;

        let mut collision = false;

        for i in 0..n {
            let y = coory + i;
            if y >= display::HEIGHT {
                break;
            }

            let row = self.memory[wrap(index + i)];

            // the most significant bit is the left most pixel
            for (m, j) in (0..display::sprite::WIDTH).rev().zip(0..display::sprite::WIDTH) {
                let x = coorx + j;
                if x >= display::WIDTH {
                    break;
                }

                let mask = 1 << m;
                if row & mask != mask {
                    continue;
                }

                let pixel = &mut self.display[y][x];
                collision |= *pixel;
                *pixel = !*pixel;
            }
        }

        self.registers[cpu::register::LAST] = collision as u8;
        self.dirty = true;

        Ok((ProgramCounterStep::Next, Operation::Draw))
    }

    fn e(&self, opcode: Opcode) -> Result<ProgramCounterStep, ProcessError> {
        let (x, nn) = opcode.xnn();
        // keys outside of the keyboard are neither pressed nor released
        let key = self.keyboard.is_pressed(self.registers[x] as usize);
        let step = match nn {
            0x9E => {
                // EX9E
                // Skips the next instruction if the key stored in VX is pressed.
                ProgramCounterStep::cond(key == Some(true))
            }
            0xA1 => {
                // EXA1
                // Skips the next instruction if the key stored in VX isn't pressed.
                ProgramCounterStep::cond(key == Some(false))
            }
            _ => return err(opcode),
        };
        Ok(step)
    }

    fn f(&mut self, opcode: Opcode) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let (x, nn) = opcode.xnn();
        let mut op = Operation::None;
        let mut pcs = ProgramCounterStep::Next;
        match nn {
            0x07 => {
                // FX07
                // Sets VX to the value of the delay timer.
                self.registers[x] = self.get_delay_timer();
            }
            0x0A => {
                // FX0A
                // A key press is awaited, and then stored in VX. Nothing changes
                // until a key is pressed, the highest pressed key wins.
                match self.keyboard.last_pressed() {
                    Some(key) => self.registers[x] = key as u8,
                    None => {
                        log::debug!("waiting for a key press");
                        op = Operation::Wait;
                        pcs = ProgramCounterStep::None;
                    }
                }
            }
            0x15 => {
                // FX15
                // Sets the delay timer to VX.
                self.delay_timer.set_value(self.registers[x]);
            }
            0x18 => {
                // FX18
                // Sets the sound timer to VX.
                self.sound_timer.set_value(self.registers[x]);
            }
            0x1E => {
                // FX1E
                // Adds VX to I. VF is not affected.
                let xi = self.registers[x] as u16;
                self.index_register = self.index_register.wrapping_add(xi);
            }
            0x29 => {
                // FX29
                // Sets I to the location of the sprite for the character in VX. Characters 0-F (in
                // hexadecimal) are represented by a 4x5 font.
                let offset = self.registers[x] as usize * display::fontset::GLYPH_SIZE;
                let location = display::fontset::LOCATION + offset;
                if offset > display::fontset::FONTSET.len() {
                    return Err(ProcessError::FontOutOfBounds { location });
                }
                self.index_register = location as u16;
            }
            0x33 => {
                // FX33
                // Stores the binary-coded decimal representation of VX, with the most significant
                // of three digits at the address in I, the middle digit at I plus 1, and the least
                // significant digit at I plus 2.
                let i = self.index_register as usize;
                let r = self.registers[x];

                self.memory[wrap(i)] = r / 100; // 246u8 / 100 => 2
                self.memory[wrap(i + 1)] = r / 10 % 10; // 246u8 / 10 => 24 % 10 => 4
                self.memory[wrap(i + 2)] = r % 10; // 246u8 % 10 => 6
            }
            0x55 => {
                // FX55
                // Stores V0 to VX (including VX) in memory starting at address I. The offset from I
                // is increased by 1 for each value written, but I itself is left unmodified.
                let index = self.index_register as usize;
                for (offset, value) in self.registers[..=x].iter().enumerate() {
                    self.memory[wrap(index + offset)] = *value;
                }
            }
            0x65 => {
                // FX65
                // Fills V0 to VX (including VX) with values from memory starting at address I. The
                // offset from I is increased by 1 for each value written, but I itself is left
                // unmodified.
                let index = self.index_register as usize;
                for (offset, value) in self.registers[..=x].iter_mut().enumerate() {
                    *value = self.memory[wrap(index + offset)];
                }
            }
            _ => return err(opcode),
        }
        Ok((pcs, op))
    }
}
