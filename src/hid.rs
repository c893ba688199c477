use crate::config::OpenOptions;
use crate::protocol::PACKET_SIZE;
use crate::transport::{Backend, Transport};
use crate::types::RawPacket;
use crate::{EpocError, Result};
use hidapi::{HidApi, HidDevice};
use std::collections::HashSet;
use std::ffi::CStr;

/// Check if a hidapi DeviceInfo is the sensor interface of an EPOC dongle.
/// macOS IOKit reports -1 for the interface number.
fn is_epoc_hid(d: &hidapi::DeviceInfo, vid: u16, pid: u16, interface: i32) -> bool {
    d.vendor_id() == vid
        && d.product_id() == pid
        && (d.interface_number() == interface || d.interface_number() == -1)
}

/// Identity of one physical dongle across its HID entries: the serial when
/// the platform reports one, otherwise the device path.
fn unit_key(serial: Option<&str>, path: &CStr) -> String {
    match serial {
        Some(s) if !s.is_empty() => format!("serial:{}", s),
        _ => format!("path:{}", path.to_string_lossy()),
    }
}

/// Number of distinct dongles among matching HID entries. On macOS every
/// interface of one dongle reports -1, so it can appear more than once.
fn count_units<I: IntoIterator<Item = String>>(keys: I) -> usize {
    keys.into_iter().collect::<HashSet<_>>().len()
}

/// Turn a raw interrupt read into a packet. Some platforms prepend a zero
/// report ID to unnumbered reports; it is stripped before the length check.
fn report_packet(buf: &mut [u8; PACKET_SIZE + 1], len: usize) -> Result<RawPacket> {
    let len = if len == PACKET_SIZE + 1 && buf[0] == 0 {
        buf.copy_within(1.., 0);
        PACKET_SIZE
    } else {
        len
    };
    RawPacket::try_from(&buf[..len.min(buf.len())])
}

fn create_hid_api() -> Result<HidApi> {
    let api = HidApi::new()?;
    #[cfg(target_os = "macos")]
    {
        // Keep HID opens shared on macOS to avoid seizing the interface.
        api.set_open_exclusive(false);
    }
    Ok(api)
}

/// hidapi-backed [`Backend`]. Each call builds a fresh `HidApi` so the
/// device list reflects what is plugged in right now.
#[derive(Debug, Clone, Copy, Default)]
pub struct HidBackend;

impl Backend for HidBackend {
    type Transport = HidTransport;

    fn device_count(&self, vid: u16, pid: u16) -> Result<usize> {
        let api = create_hid_api()?;
        let interface = crate::protocol::HID_INTERFACE;
        Ok(count_units(
            api.device_list()
                .filter(|d| is_epoc_hid(d, vid, pid, interface))
                .map(|d| unit_key(d.serial_number(), d.path())),
        ))
    }

    fn open(&self, vid: u16, pid: u16, options: &OpenOptions) -> Result<HidTransport> {
        let api = create_hid_api()
            .map_err(|e| EpocError::Connection(format!("HID init failed: {}", e)))?;

        let hid_info = api
            .device_list()
            .find(|d| is_epoc_hid(d, vid, pid, options.interface))
            .ok_or(EpocError::DeviceNotFound)?;

        let serial = hid_info.serial_number().map(str::to_owned);
        let device = api
            .open_path(hid_info.path())
            .map_err(|e| EpocError::Connection(format!("open {:?}: {}", hid_info.path(), e)))?;

        Ok(HidTransport::new(device, serial))
    }
}

/// Interrupt-report reader for one EPOC dongle.
///
/// hidapi has no "bytes available" query, so `poll()` performs a zero-timeout
/// read and parks the report until `read_raw()` takes it.
pub struct HidTransport {
    device: HidDevice,
    serial: Option<String>,
    buf: [u8; PACKET_SIZE + 1],
    pending: Option<usize>,
}

impl HidTransport {
    pub fn new(device: HidDevice, serial: Option<String>) -> Self {
        Self {
            device,
            serial,
            buf: [0u8; PACKET_SIZE + 1],
            pending: None,
        }
    }
}

impl Transport for HidTransport {
    fn poll(&mut self) -> Result<usize> {
        if let Some(len) = self.pending {
            return Ok(len);
        }

        let len = self
            .device
            .read_timeout(&mut self.buf, 0)
            .map_err(|e| EpocError::Transport(format!("read failed: {}", e)))?;
        if len == 0 {
            return Ok(0);
        }

        self.pending = Some(len);
        Ok(len)
    }

    fn read_raw(&mut self) -> Result<RawPacket> {
        let len = self
            .pending
            .take()
            .ok_or_else(|| EpocError::Transport("no report pending".into()))?;
        report_packet(&mut self.buf, len)
    }

    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn close(self) {
        log::debug!("Closing HID session (serial={:?})", self.serial);
        drop(self.device);
    }
}
