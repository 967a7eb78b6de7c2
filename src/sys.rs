//! Platform syscall shims: wall-clock setting, Seatalk serial parity
//! control and the watchdog ioctl. Everything here is synchronous; callers
//! on the async side go through `spawn_blocking`.

use std::io;

/// Sets the system wall clock to the given UTC time.
#[cfg(unix)]
pub fn set_system_time(utc: chrono::DateTime<chrono::Utc>) -> io::Result<()> {
    let tv = libc::timeval {
        tv_sec: utc.timestamp() as libc::time_t,
        tv_usec: i64::from(utc.timestamp_subsec_micros()) as libc::suseconds_t,
    };
    // SAFETY: tv is a valid timeval; the timezone argument must be null.
    let rc = unsafe { libc::settimeofday(&tv, std::ptr::null()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn set_system_time(_utc: chrono::DateTime<chrono::Utc>) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "system time setting is only implemented on unix",
    ))
}

/// Writes the running system time into the hardware clock. Errors are worth
/// a warning but never fatal; the wall clock is already set.
#[cfg(target_os = "linux")]
pub fn sync_hardware_clock() -> io::Result<()> {
    let status = std::process::Command::new("hwclock").arg("-w").status()?;
    if !status.success() {
        return Err(io::Error::other(format!("hwclock -w exited with {status}")));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn sync_hardware_clock() -> io::Result<()> {
    Ok(())
}

/// Seatalk serial port parity control. The 9th bit of the Seatalk frame is
/// surfaced by configuring space parity with `INPCK | PARMRK`: a received
/// byte whose parity bit is mark arrives flagged as an in-band
/// `FF 00 <byte>` escape, which is exactly the command-byte marker the
/// framer needs.
#[cfg(target_os = "linux")]
pub mod seatalk_serial {
    use std::io;
    use std::os::fd::RawFd;

    fn tcgetattr(fd: RawFd) -> io::Result<libc::termios> {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: fd is a serial port descriptor, termios is out-only.
        let rc = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: initialised by a successful tcgetattr.
        Ok(unsafe { termios.assume_init() })
    }

    fn tcsetattr_drain(fd: RawFd, termios: &libc::termios) -> io::Result<()> {
        // SAFETY: fd valid, termios fully initialised.
        let rc = unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, termios) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Switches the port to 4800/8/1 with space parity and in-band parity
    /// error marking.
    pub fn enable_parity_surfacing(fd: RawFd) -> io::Result<()> {
        let mut termios = tcgetattr(fd)?;
        termios.c_cflag |= libc::PARENB | libc::CMSPAR;
        termios.c_cflag &= !(libc::PARODD | libc::CSTOPB);
        termios.c_iflag |= libc::INPCK | libc::PARMRK;
        termios.c_iflag &= !libc::IGNPAR;
        tcsetattr_drain(fd, &termios)
    }

    /// Writes one datagram with mark parity on the command byte and space
    /// parity on the payload. Each parity switch drains the line first, so
    /// the 9th bit lands on the right bytes at 4800 baud.
    pub fn write_datagram(fd: RawFd, bytes: &[u8]) -> io::Result<()> {
        let Some((command, payload)) = bytes.split_first() else {
            return Ok(());
        };
        set_parity(fd, Parity::Mark)?;
        write_all(fd, std::slice::from_ref(command))?;
        drain(fd)?;
        set_parity(fd, Parity::Space)?;
        write_all(fd, payload)?;
        drain(fd)
    }

    /// Writes bytes with space parity throughout (payload-only output).
    pub fn write_space_parity(fd: RawFd, bytes: &[u8]) -> io::Result<()> {
        set_parity(fd, Parity::Space)?;
        write_all(fd, bytes)?;
        drain(fd)
    }

    enum Parity {
        Mark,
        Space,
    }

    fn set_parity(fd: RawFd, parity: Parity) -> io::Result<()> {
        let mut termios = tcgetattr(fd)?;
        termios.c_cflag |= libc::PARENB | libc::CMSPAR;
        match parity {
            Parity::Mark => termios.c_cflag |= libc::PARODD,
            Parity::Space => termios.c_cflag &= !libc::PARODD,
        }
        tcsetattr_drain(fd, &termios)
    }

    fn write_all(fd: RawFd, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            // SAFETY: the buffer lives for the duration of the call.
            let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
            if written < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted => continue,
                    // The descriptor is non-blocking (the async read half
                    // shares it); at 4800 baud a short wait always clears.
                    io::ErrorKind::WouldBlock => {
                        std::thread::sleep(std::time::Duration::from_millis(2));
                        continue;
                    }
                    _ => return Err(err),
                }
            }
            bytes = &bytes[written as usize..];
        }
        Ok(())
    }

    fn drain(fd: RawFd) -> io::Result<()> {
        // SAFETY: fd is a valid serial descriptor.
        let rc = unsafe { libc::tcdrain(fd) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Linux watchdog character device ioctls (see linux/watchdog.h).
#[cfg(target_os = "linux")]
pub mod watchdog_dev {
    use std::io;
    use std::os::fd::RawFd;

    // _IOWR('W', 6, int)
    const WDIOC_SETTIMEOUT: libc::c_ulong = 0xC004_5706;
    // _IOR('W', 7, int)
    const WDIOC_GETTIMEOUT: libc::c_ulong = 0x8004_5707;

    pub fn set_timeout(fd: RawFd, seconds: u32) -> io::Result<u32> {
        let mut value = seconds as libc::c_int;
        // SAFETY: WDIOC_SETTIMEOUT reads and writes one c_int.
        let rc = unsafe { libc::ioctl(fd, WDIOC_SETTIMEOUT, &mut value) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(value as u32)
    }

    pub fn get_timeout(fd: RawFd) -> io::Result<u32> {
        let mut value: libc::c_int = 0;
        // SAFETY: WDIOC_GETTIMEOUT writes one c_int.
        let rc = unsafe { libc::ioctl(fd, WDIOC_GETTIMEOUT, &mut value) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(value as u32)
    }
}
