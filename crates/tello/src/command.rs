use std::{
    io,
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::TelloConfig;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Bind/{0}")]
    Bind(io::Error),
    #[error("Send '{command}'/{source}")]
    Send {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("No response to '{command}' within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("Receive '{command}'/{source}")]
    Receive {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Drone rejected '{command}': {response}")]
    Rejected { command: String, response: String },
    #[error("Unexpected response to '{command}': {response}")]
    Unexpected { command: String, response: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Error(String),
    Value(String),
}

impl Response {
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw).trim().to_string();

        if text.eq_ignore_ascii_case("ok") {
            Self::Ok
        } else if text.to_ascii_lowercase().starts_with("error") {
            Self::Error(text)
        } else {
            Self::Value(text)
        }
    }
}

/// Command channel to a Tello in SDK mode.
pub struct Tello {
    socket: UdpSocket,
    drone_addr: SocketAddr,
    response_timeout: Duration,
}

impl Tello {
    const MAX_RESPONSE_LEN: usize = 1024;

    /// Binds the command socket and enters SDK mode.
    pub fn connect(config: &TelloConfig) -> Result<Self, CommandError> {
        let socket = UdpSocket::bind(config.local_addr).map_err(CommandError::Bind)?;
        socket
            .set_read_timeout(Some(config.response_timeout))
            .map_err(CommandError::Bind)?;

        let tello = Self {
            socket,
            drone_addr: config.drone_addr,
            response_timeout: config.response_timeout,
        };

        tello.send_control_command("command")?;
        info!("Connected to Tello at {}", tello.drone_addr);

        Ok(tello)
    }

    pub fn drone_addr(&self) -> SocketAddr {
        self.drone_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_command(&self, command: &str) -> Result<Response, CommandError> {
        debug!("Sending '{command}' to {}", self.drone_addr);

        self.send_command_without_response(command)?;

        let mut buf = [0u8; Self::MAX_RESPONSE_LEN];

        loop {
            let (len, from) = self.socket.recv_from(&mut buf).map_err(|source| {
                if matches!(
                    source.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) {
                    CommandError::Timeout {
                        command: command.to_string(),
                        timeout: self.response_timeout,
                    }
                } else {
                    CommandError::Receive {
                        command: command.to_string(),
                        source,
                    }
                }
            })?;

            if from != self.drone_addr {
                warn!("Ignoring datagram from unexpected peer {from}");
                continue;
            }

            let response = Response::parse(&buf[..len]);
            debug!("Response to '{command}': {response:?}");
            return Ok(response);
        }
    }

    /// Sends a command that must be acknowledged with `ok`.
    pub fn send_control_command(&self, command: &str) -> Result<(), CommandError> {
        match self.send_command(command)? {
            Response::Ok => Ok(()),
            Response::Error(response) => Err(CommandError::Rejected {
                command: command.to_string(),
                response,
            }),
            Response::Value(response) => Err(CommandError::Unexpected {
                command: command.to_string(),
                response,
            }),
        }
    }

    pub fn send_command_without_response(&self, command: &str) -> Result<(), CommandError> {
        self.socket
            .send_to(command.as_bytes(), self.drone_addr)
            .map_err(|source| CommandError::Send {
                command: command.to_string(),
                source,
            })?;

        Ok(())
    }

    pub fn stream_on(&self) -> Result<(), CommandError> {
        self.send_control_command("streamon")
    }

    pub fn stream_off(&self) -> Result<(), CommandError> {
        self.send_control_command("streamoff")
    }

    /// Battery level in percent.
    pub fn battery(&self) -> Result<u8, CommandError> {
        match self.send_command("battery?")? {
            Response::Value(value) => value.parse().map_err(|_| CommandError::Unexpected {
                command: "battery?".to_string(),
                response: value,
            }),
            Response::Ok => Err(CommandError::Unexpected {
                command: "battery?".to_string(),
                response: "ok".to_string(),
            }),
            Response::Error(response) => Err(CommandError::Rejected {
                command: "battery?".to_string(),
                response,
            }),
        }
    }

    /// The drone drops the link while rebooting, so nothing is awaited.
    pub fn reboot(&self) -> Result<(), CommandError> {
        info!("Rebooting Tello");
        self.send_command_without_response("reboot")
    }

    /// Starts the video feed and runs `record`, then reboots the drone
    /// whatever either of them returned. A failed reboot is only logged.
    pub fn run_streaming<T, E: From<CommandError>>(
        &self,
        record: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let result = match self.stream_on() {
            Ok(()) => record(self),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = self.reboot() {
            warn!("Failed to reboot Tello: {e}");
        }

        result
    }
}
