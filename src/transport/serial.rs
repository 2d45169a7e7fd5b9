use super::CommandSink;
use crate::error::TransportError;
use crate::events::HardwareCommand;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Serial line to the feedback microcontroller, raw 8N1
pub struct SerialCommandSink {
    device: String,
    file: File,
}

impl SerialCommandSink {
    /// Open the device and put the line into raw mode at `baud_rate`
    pub fn open(device: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let file = open_device(device)?;
        configure_raw(&file, device, baud_rate)?;
        info!("Serial line {} configured at {} baud", device, baud_rate);

        Ok(Self {
            device: device.to_string(),
            file: File::from_std(file),
        })
    }
}

#[async_trait::async_trait]
impl CommandSink for SerialCommandSink {
    async fn send(&mut self, command: HardwareCommand) -> Result<(), TransportError> {
        let write_error = |e: std::io::Error| TransportError::Write {
            command: command.as_char(),
            details: e.to_string(),
        };

        self.file
            .write_all(&[command.as_byte()])
            .await
            .map_err(write_error)?;
        self.file.flush().await.map_err(write_error)?;

        debug!("Sent '{}' to {}", command.as_char(), self.device);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.device
    }
}

/// Opened non-blocking so a line without carrier cannot stall the open;
/// [`configure_raw`] restores blocking writes once `CLOCAL` is set.
#[cfg(unix)]
fn open_device(device: &str) -> Result<std::fs::File, TransportError> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(device)
        .map_err(|e| TransportError::Open {
            device: device.to_string(),
            source: e,
        })
}

#[cfg(unix)]
fn configure_raw(file: &std::fs::File, device: &str, baud_rate: u32) -> Result<(), TransportError> {
    use std::os::unix::io::AsRawFd;

    let speed = baud_constant(baud_rate).ok_or_else(|| TransportError::Configure {
        device: device.to_string(),
        details: format!("unsupported baud rate {}", baud_rate),
    })?;

    let fd = file.as_raw_fd();
    let failed = |call: &str| TransportError::Configure {
        device: device.to_string(),
        details: format!("{} failed: {}", call, std::io::Error::last_os_error()),
    };

    // SAFETY: `fd` stays open for the lifetime of `file`, and `tty` is filled
    // in by tcgetattr before any field is read.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
        return Err(failed("tcgetattr"));
    }

    unsafe { libc::cfmakeraw(&mut tty) };
    if unsafe { libc::cfsetispeed(&mut tty, speed) } != 0
        || unsafe { libc::cfsetospeed(&mut tty, speed) } != 0
    {
        return Err(failed("cfsetspeed"));
    }

    tty.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
    tty.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
    #[cfg(target_os = "linux")]
    {
        tty.c_cflag &= !libc::CRTSCTS;
    }

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
        return Err(failed("tcsetattr"));
    }

    clear_nonblocking(file, device)
}

#[cfg(unix)]
fn clear_nonblocking(file: &std::fs::File, device: &str) -> Result<(), TransportError> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let failed = |call: &str| TransportError::Configure {
        device: device.to_string(),
        details: format!("{} failed: {}", call, std::io::Error::last_os_error()),
    };

    // SAFETY: `fd` stays open for the lifetime of `file`.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(failed("fcntl(F_GETFL)"));
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(failed("fcntl(F_SETFL)"));
    }
    Ok(())
}

#[cfg(unix)]
fn baud_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

#[cfg(not(unix))]
fn open_device(device: &str) -> Result<std::fs::File, TransportError> {
    Err(TransportError::Configure {
        device: device.to_string(),
        details: "serial transport requires a Unix platform".to_string(),
    })
}

#[cfg(not(unix))]
fn configure_raw(
    _file: &std::fs::File,
    _device: &str,
    _baud_rate: u32,
) -> Result<(), TransportError> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::SUPPORTED_BAUD_RATES;

    #[test]
    fn test_supported_rates_have_constants() {
        for rate in SUPPORTED_BAUD_RATES {
            assert!(baud_constant(*rate).is_some(), "no constant for {}", rate);
        }
        assert!(baud_constant(12345).is_none());
    }

    #[test]
    fn test_open_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyNONE");
        let result = SerialCommandSink::open(&path.display().to_string(), 9600);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn test_device_returns_to_blocking_mode() {
        use std::os::unix::io::AsRawFd;

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().display().to_string();
        let opened = open_device(&path).unwrap();

        let flags = unsafe { libc::fcntl(opened.as_raw_fd(), libc::F_GETFL) };
        assert_ne!(flags & libc::O_NONBLOCK, 0);

        clear_nonblocking(&opened, &path).unwrap();
        let flags = unsafe { libc::fcntl(opened.as_raw_fd(), libc::F_GETFL) };
        assert_eq!(flags & libc::O_NONBLOCK, 0);
    }

    #[test]
    fn test_regular_file_is_not_a_serial_line() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = SerialCommandSink::open(&file.path().display().to_string(), 9600);
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }
}
