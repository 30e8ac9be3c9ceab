//! Byte-level framing for the engine's remote-control protocol.
//!
//! All integers are big-endian. A message is a 4-byte total length followed
//! by commands; each command carries its own length prefix.

use crate::error::{EngineError, EngineResult};

// Commands
pub const CMD_GETVERSION: u8 = 0x00;
pub const CMD_SIMSTEP: u8 = 0x02;
pub const CMD_CLOSE: u8 = 0x7F;
pub const CMD_GET_TL_VARIABLE: u8 = 0xA2;
pub const CMD_GET_LANE_VARIABLE: u8 = 0xA3;
pub const CMD_GET_VEHICLE_VARIABLE: u8 = 0xA4;
pub const CMD_GET_SIM_VARIABLE: u8 = 0xAB;
pub const CMD_SET_TL_VARIABLE: u8 = 0xC2;
pub const CMD_SET_VEHICLE_VARIABLE: u8 = 0xC4;

/// GET responses echo the command id shifted by this offset.
pub const RESPONSE_OFFSET: u8 = 0x10;

// Value types
pub const TYPE_UBYTE: u8 = 0x07;
pub const TYPE_INTEGER: u8 = 0x09;
pub const TYPE_DOUBLE: u8 = 0x0B;
pub const TYPE_STRING: u8 = 0x0C;
pub const TYPE_STRINGLIST: u8 = 0x0E;

// Status codes
pub const RTYPE_OK: u8 = 0x00;

// Variables
pub const ID_LIST: u8 = 0x00;
pub const LAST_STEP_VEHICLE_ID_LIST: u8 = 0x12;
pub const TL_PHASE_DURATION: u8 = 0x24;
pub const TL_CONTROLLED_LANES: u8 = 0x26;
pub const TL_CURRENT_PHASE: u8 = 0x28;
pub const VAR_SPEED: u8 = 0x40;
pub const VAR_TYPE: u8 = 0x4F;
pub const VAR_FUELCONSUMPTION: u8 = 0x65;
pub const VAR_TIME: u8 = 0x66;
pub const VAR_ACCELERATION: u8 = 0x72;
pub const VAR_DEPARTED_VEHICLES_IDS: u8 = 0x74;
pub const VAR_WAITING_TIME: u8 = 0x7A;
pub const VAR_ACCUMULATED_WAITING_TIME: u8 = 0x87;
pub const VAR_STOPSTATE: u8 = 0xB5;

/// Builds the payload of an outgoing command.
#[derive(Debug, Default, Clone)]
pub struct CommandWriter {
    buf: Vec<u8>,
}

impl CommandWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f64(mut self, value: f64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn typed_f64(self, value: f64) -> Self {
        self.u8(TYPE_DOUBLE).f64(value)
    }

    pub fn typed_string(self, value: &str) -> Self {
        self.u8(TYPE_STRING).string(value)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Appends one length-prefixed command to `out`.
pub fn encode_command(out: &mut Vec<u8>, command: u8, payload: &[u8]) {
    let short_len = 1 + 1 + payload.len();
    if short_len <= u8::MAX as usize {
        out.push(short_len as u8);
    } else {
        // Extended form: zero marker, then a 4-byte length covering the header.
        out.push(0);
        out.extend_from_slice(&((short_len + 4) as u32).to_be_bytes());
    }
    out.push(command);
    out.extend_from_slice(payload);
}

/// Wraps encoded commands into a message with the total-length header.
pub fn frame_message(commands: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(commands.len() + 4);
    message.extend_from_slice(&((commands.len() + 4) as u32).to_be_bytes());
    message.extend_from_slice(commands);
    message
}

/// GET command payload: variable id followed by object id.
pub fn get_payload(variable: u8, object_id: &str) -> Vec<u8> {
    CommandWriter::new()
        .u8(variable)
        .string(object_id)
        .into_bytes()
}

/// Cursor over a received message body (without the 4-byte header).
#[derive(Debug)]
pub struct ResponseReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ResponseReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(EngineError::Protocol(format!(
                "needed {} bytes at offset {}, only {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i32(&mut self) -> EngineResult<i32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn f64(&mut self) -> EngineResult<f64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(f64::from_be_bytes(bytes))
    }

    fn length(&mut self) -> EngineResult<usize> {
        let len = self.i32()?;
        usize::try_from(len)
            .map_err(|_| EngineError::Protocol(format!("negative length {}", len)))
    }

    pub fn string(&mut self) -> EngineResult<String> {
        let len = self.length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EngineError::Protocol(format!("invalid UTF-8 string: {}", e)))
    }

    pub fn string_list(&mut self) -> EngineResult<Vec<String>> {
        let count = self.length()?;
        (0..count).map(|_| self.string()).collect()
    }

    fn expect_type(&mut self, expected: u8) -> EngineResult<()> {
        let found = self.u8()?;
        if found != expected {
            return Err(EngineError::Protocol(format!(
                "expected value type 0x{:02x}, found 0x{:02x}",
                expected, found
            )));
        }
        Ok(())
    }

    /// Integer sent either as a ubyte or as an int; engine versions differ
    /// for bit-field variables such as the stop state.
    pub fn typed_int(&mut self) -> EngineResult<i32> {
        match self.u8()? {
            TYPE_UBYTE => Ok(i32::from(self.u8()?)),
            TYPE_INTEGER => self.i32(),
            found => Err(EngineError::Protocol(format!(
                "expected integer value type, found 0x{:02x}",
                found
            ))),
        }
    }

    pub fn typed_i32(&mut self) -> EngineResult<i32> {
        self.expect_type(TYPE_INTEGER)?;
        self.i32()
    }

    pub fn typed_f64(&mut self) -> EngineResult<f64> {
        self.expect_type(TYPE_DOUBLE)?;
        self.f64()
    }

    pub fn typed_string(&mut self) -> EngineResult<String> {
        self.expect_type(TYPE_STRING)?;
        self.string()
    }

    pub fn typed_string_list(&mut self) -> EngineResult<Vec<String>> {
        self.expect_type(TYPE_STRINGLIST)?;
        self.string_list()
    }

    /// Reads a command header and returns `(command id, payload length)`.
    pub fn command_header(&mut self) -> EngineResult<(u8, usize)> {
        let short = self.u8()? as usize;
        let (total, header) = if short == 0 {
            (self.length()?, 5)
        } else {
            (short, 1)
        };
        if total < header + 1 {
            return Err(EngineError::Protocol(format!(
                "command length {} too short",
                total
            )));
        }
        let id = self.u8()?;
        Ok((id, total - header - 1))
    }

    /// Reads the status command that answers every request.
    pub fn status(&mut self, command: u8) -> EngineResult<()> {
        let (id, _) = self.command_header()?;
        if id != command {
            return Err(EngineError::Protocol(format!(
                "status for command 0x{:02x}, expected 0x{:02x}",
                id, command
            )));
        }
        let status = self.u8()?;
        let description = self.string()?;
        if status != RTYPE_OK {
            return Err(EngineError::Command {
                command,
                status,
                description,
            });
        }
        Ok(())
    }

    /// Reads a GET response header up to (not including) the typed value.
    pub fn get_response(&mut self, command: u8, variable: u8) -> EngineResult<String> {
        let (id, _) = self.command_header()?;
        let expected = command.wrapping_add(RESPONSE_OFFSET);
        if id != expected {
            return Err(EngineError::Protocol(format!(
                "response id 0x{:02x}, expected 0x{:02x}",
                id, expected
            )));
        }
        let var = self.u8()?;
        if var != variable {
            return Err(EngineError::Protocol(format!(
                "response for variable 0x{:02x}, expected 0x{:02x}",
                var, variable
            )));
        }
        self.string()
    }
}
