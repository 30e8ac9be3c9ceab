use super::protocol::*;
use crate::error::{EngineError, EngineResult};
use crate::simulation_engine::{TrafficEngine, VehicleState};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::process::Child;

/// A live remote-control session with one engine process.
///
/// Dropping an unclosed connection sends CLOSE and reaps the process, so the
/// engine is released on every exit path.
#[derive(Debug)]
pub struct TraciConnection {
    stream: TcpStream,
    child: Option<Child>,
    closed: bool,
}

impl TraciConnection {
    /// Takes ownership of the engine process first, so a failure here still
    /// releases it on drop.
    pub fn new(stream: TcpStream, child: Option<Child>) -> EngineResult<Self> {
        let connection = Self {
            stream,
            child,
            closed: false,
        };
        connection.stream.set_nodelay(true)?;
        Ok(connection)
    }

    /// Engine API version and identification string.
    pub fn version(&mut self) -> EngineResult<(i32, String)> {
        let body = self.send(CMD_GETVERSION, &[])?;
        let mut reader = ResponseReader::new(&body);
        reader.status(CMD_GETVERSION)?;
        let (id, _) = reader.command_header()?;
        if id != CMD_GETVERSION {
            return Err(EngineError::Protocol(format!(
                "unexpected version response 0x{:02x}",
                id
            )));
        }
        let api = reader.i32()?;
        let identifier = reader.string()?;
        Ok((api, identifier))
    }

    fn send(&mut self, command: u8, payload: &[u8]) -> EngineResult<Vec<u8>> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        let mut commands = Vec::with_capacity(payload.len() + 6);
        encode_command(&mut commands, command, payload);
        self.stream.write_all(&frame_message(&commands))?;
        self.receive()
    }

    fn receive(&mut self) -> EngineResult<Vec<u8>> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header)?;
        let total = u32::from_be_bytes(header) as usize;
        if total < header.len() {
            return Err(EngineError::Protocol(format!(
                "message length {} too short",
                total
            )));
        }
        let mut body = vec![0u8; total - header.len()];
        self.stream.read_exact(&mut body)?;
        Ok(body)
    }

    fn get<T>(
        &mut self,
        command: u8,
        variable: u8,
        object_id: &str,
        read: impl FnOnce(&mut ResponseReader) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let body = self.send(command, &get_payload(variable, object_id))?;
        let mut reader = ResponseReader::new(&body);
        reader.status(command)?;
        reader.get_response(command, variable)?;
        read(&mut reader)
    }

    fn set(&mut self, command: u8, payload: Vec<u8>) -> EngineResult<()> {
        let body = self.send(command, &payload)?;
        ResponseReader::new(&body).status(command)
    }

    fn vehicle_f64(&mut self, variable: u8, vehicle_id: &str) -> EngineResult<f64> {
        self.get(CMD_GET_VEHICLE_VARIABLE, variable, vehicle_id, |r| {
            r.typed_f64()
        })
    }

    fn release(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self
            .send(CMD_CLOSE, &[])
            .and_then(|body| ResponseReader::new(&body).status(CMD_CLOSE));
        self.closed = true;
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(mut child) = self.child.take() {
            if result.is_err() {
                let _ = child.kill();
            }
            let status = child.wait()?;
            log::debug!("Engine process exited with {}", status);
        }
        result
    }
}

impl TrafficEngine for TraciConnection {
    fn simulation_step(&mut self) -> EngineResult<()> {
        // Target time 0 advances exactly one step.
        let payload = CommandWriter::new().f64(0.0).into_bytes();
        let body = self.send(CMD_SIMSTEP, &payload)?;
        ResponseReader::new(&body).status(CMD_SIMSTEP)
    }

    fn simulation_time(&mut self) -> EngineResult<f64> {
        self.get(CMD_GET_SIM_VARIABLE, VAR_TIME, "", |r| r.typed_f64())
    }

    fn departed_vehicle_ids(&mut self) -> EngineResult<Vec<String>> {
        self.get(CMD_GET_SIM_VARIABLE, VAR_DEPARTED_VEHICLES_IDS, "", |r| {
            r.typed_string_list()
        })
    }

    fn vehicle_ids(&mut self) -> EngineResult<Vec<String>> {
        self.get(CMD_GET_VEHICLE_VARIABLE, ID_LIST, "", |r| {
            r.typed_string_list()
        })
    }

    fn vehicle_state(&mut self, vehicle_id: &str) -> EngineResult<VehicleState> {
        let stop_state = self.get(CMD_GET_VEHICLE_VARIABLE, VAR_STOPSTATE, vehicle_id, |r| {
            r.typed_int()
        })?;
        Ok(VehicleState {
            speed: self.vehicle_f64(VAR_SPEED, vehicle_id)?,
            acceleration: self.vehicle_f64(VAR_ACCELERATION, vehicle_id)?,
            fuel_consumption: self.vehicle_f64(VAR_FUELCONSUMPTION, vehicle_id)?,
            stop_state,
            waiting_time: self.vehicle_f64(VAR_WAITING_TIME, vehicle_id)?,
            accumulated_waiting_time: self
                .vehicle_f64(VAR_ACCUMULATED_WAITING_TIME, vehicle_id)?,
        })
    }

    fn vehicle_waiting_time(&mut self, vehicle_id: &str) -> EngineResult<f64> {
        self.vehicle_f64(VAR_WAITING_TIME, vehicle_id)
    }

    fn set_vehicle_type(&mut self, vehicle_id: &str, type_id: &str) -> EngineResult<()> {
        let payload = CommandWriter::new()
            .u8(VAR_TYPE)
            .string(vehicle_id)
            .typed_string(type_id)
            .into_bytes();
        self.set(CMD_SET_VEHICLE_VARIABLE, payload)
    }

    fn traffic_light_ids(&mut self) -> EngineResult<Vec<String>> {
        self.get(CMD_GET_TL_VARIABLE, ID_LIST, "", |r| r.typed_string_list())
    }

    fn controlled_lanes(&mut self, tls_id: &str) -> EngineResult<Vec<String>> {
        self.get(CMD_GET_TL_VARIABLE, TL_CONTROLLED_LANES, tls_id, |r| {
            r.typed_string_list()
        })
    }

    fn lane_vehicle_ids(&mut self, lane_id: &str) -> EngineResult<Vec<String>> {
        self.get(CMD_GET_LANE_VARIABLE, LAST_STEP_VEHICLE_ID_LIST, lane_id, |r| {
            r.typed_string_list()
        })
    }

    fn current_phase(&mut self, tls_id: &str) -> EngineResult<i32> {
        self.get(CMD_GET_TL_VARIABLE, TL_CURRENT_PHASE, tls_id, |r| r.typed_i32())
    }

    fn set_phase_duration(&mut self, tls_id: &str, duration: f64) -> EngineResult<()> {
        let payload = CommandWriter::new()
            .u8(TL_PHASE_DURATION)
            .string(tls_id)
            .typed_f64(duration)
            .into_bytes();
        self.set(CMD_SET_TL_VARIABLE, payload)
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        self.release()
    }
}

impl Drop for TraciConnection {
    fn drop(&mut self) {
        if !self.closed {
            log::warn!("Engine connection dropped without close, releasing it now");
            if let Err(e) = self.release() {
                log::warn!("Failed to release engine connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn status(command: u8) -> Vec<u8> {
        let mut out = Vec::new();
        let payload = CommandWriter::new().u8(RTYPE_OK).string("").into_bytes();
        encode_command(&mut out, command, &payload);
        out
    }

    fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(header) as usize - 4];
        stream.read_exact(&mut body).unwrap();
        body
    }

    /// Reads one GET request and answers it with `value` (type byte included).
    fn answer_get(stream: &mut TcpStream, command: u8, value: Vec<u8>) -> Vec<u8> {
        let req = read_request(stream);
        // len, cmd, var, object id
        let variable = req[2];
        let object = ResponseReader::new(&req[3..]).string().unwrap();

        let mut reply = status(command);
        let mut payload = CommandWriter::new().u8(variable).string(&object).into_bytes();
        payload.extend_from_slice(&value);
        encode_command(&mut reply, command + RESPONSE_OFFSET, &payload);
        stream.write_all(&frame_message(&reply)).unwrap();
        req
    }

    /// Answers a simulation-time query, one vehicle state (stop state sent
    /// as an int), a phase-duration set, then CLOSE.
    fn fake_engine(listener: TcpListener) -> thread::JoinHandle<Vec<Vec<u8>>> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut requests = Vec::new();

            let time = CommandWriter::new().typed_f64(42.0).into_bytes();
            requests.push(answer_get(&mut stream, CMD_GET_SIM_VARIABLE, time));

            let stop_state = CommandWriter::new().u8(TYPE_INTEGER).i32(1).into_bytes();
            requests.push(answer_get(&mut stream, CMD_GET_VEHICLE_VARIABLE, stop_state));
            // speed, acceleration, fuel, waiting, accumulated waiting
            for value in [0.0, -8.0, 0.5, 12.0, 30.0] {
                let double = CommandWriter::new().typed_f64(value).into_bytes();
                requests.push(answer_get(&mut stream, CMD_GET_VEHICLE_VARIABLE, double));
            }

            let req = read_request(&mut stream);
            stream
                .write_all(&frame_message(&status(CMD_SET_TL_VARIABLE)))
                .unwrap();
            requests.push(req);

            let req = read_request(&mut stream);
            stream.write_all(&frame_message(&status(CMD_CLOSE))).unwrap();
            requests.push(req);
            requests
        })
    }

    #[test]
    fn talks_to_a_loopback_engine() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = fake_engine(listener);

        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut conn = TraciConnection::new(stream, None).unwrap();
        assert_eq!(conn.simulation_time().unwrap(), 42.0);
        let state = conn.vehicle_state("veh0").unwrap();
        assert_eq!(state.stop_state, 1);
        assert!(state.is_stopped());
        assert_eq!(state.acceleration, -8.0);
        assert_eq!(state.accumulated_waiting_time, 30.0);
        conn.set_phase_duration("J1", 10.0).unwrap();
        conn.close().unwrap();
        assert!(matches!(conn.close(), Err(EngineError::Closed)));
        assert!(matches!(conn.simulation_step(), Err(EngineError::Closed)));

        let requests = server.join().unwrap();
        assert_eq!(requests[0][1], CMD_GET_SIM_VARIABLE);
        assert_eq!(requests[0][2], VAR_TIME);
        assert_eq!(requests[1][1], CMD_GET_VEHICLE_VARIABLE);
        assert_eq!(requests[1][2], VAR_STOPSTATE);
        let set = &requests[7];
        assert_eq!(set[1], CMD_SET_TL_VARIABLE);
        assert_eq!(set[2], TL_PHASE_DURATION);
        // var, id length, "J1", type byte, f64
        let value_at = 3 + 4 + 2;
        assert_eq!(set[value_at], TYPE_DOUBLE);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&set[value_at + 1..value_at + 9]);
        assert_eq!(f64::from_be_bytes(bytes), 10.0);
        assert_eq!(requests[8][1], CMD_CLOSE);
    }
}
