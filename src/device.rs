use crate::config::{IdlePolicy, OpenOptions};
use crate::decode::{PacketTransform, PlaintextLayout};
use crate::hid::{HidBackend, HidTransport};
use crate::protocol::{PID, VID};
use crate::transport::{Backend, Transport};
use crate::types::DeviceVariant;
use crate::{EpocError, Result};

/// Number of attached EPOC dongles.
///
/// Both variants share one USB identity, so `_variant` does not narrow the
/// count. Enumeration failures are logged and reported as 0.
pub fn count(variant: DeviceVariant) -> usize {
    count_with(&HidBackend, variant)
}

/// [`count`] against an explicit backend.
pub fn count_with<B: Backend>(backend: &B, _variant: DeviceVariant) -> usize {
    match backend.device_count(VID, PID) {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Failed to enumerate EPOC devices: {}", e);
            0
        }
    }
}

/// An open connection to one EPOC headset.
///
/// Owns the transport session exclusively. Release it with
/// [`DeviceHandle::close`]; the handle cannot be used afterwards.
pub struct DeviceHandle<T = HidTransport, D = PlaintextLayout> {
    pub(crate) transport: T,
    pub(crate) transform: D,
    pub(crate) variant: DeviceVariant,
    pub(crate) idle: IdlePolicy,
    pub(crate) battery: Option<u8>,
}

impl DeviceHandle {
    /// Open the first attached EPOC over hidapi, decoding with
    /// [`PlaintextLayout`].
    pub fn open(variant: DeviceVariant) -> Result<DeviceHandle> {
        Self::open_with_options(&OpenOptions::new(variant))
    }

    pub fn open_with_options(options: &OpenOptions) -> Result<DeviceHandle> {
        DeviceHandle::open_with(&HidBackend, options, PlaintextLayout)
    }
}

impl<T: Transport, D: PacketTransform> DeviceHandle<T, D> {
    /// Open the first matching device on `backend` and bind `transform` as
    /// its decoder. On failure no handle exists.
    pub fn open_with<B>(backend: &B, options: &OpenOptions, transform: D) -> Result<Self>
    where
        B: Backend<Transport = T>,
    {
        let transport = backend
            .open(VID, PID, options)
            .map_err(|e| match e {
                e if e.is_connection() => e,
                other => EpocError::Connection(other.to_string()),
            })?;

        log::info!(
            "Opened EPOC: variant={:?} serial={}",
            options.variant,
            transport.serial().unwrap_or("<unknown>")
        );

        Ok(DeviceHandle {
            transport,
            transform,
            variant: options.variant,
            idle: options.idle,
            battery: None,
        })
    }

    /// Release the transport session and decoder.
    pub fn close(self) {
        log::info!("Closing EPOC (variant={:?})", self.variant);
        self.transport.close();
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// USB serial number, the key material a decryptor derives from.
    pub fn serial(&self) -> Option<&str> {
        self.transport.serial()
    }

    /// Last battery percentage reported by the headset, if any has arrived.
    pub fn battery(&self) -> Option<u8> {
        self.battery
    }

    pub fn transform(&self) -> &D {
        &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::{stub_transform, StubBackend};

    #[test]
    fn test_count_reports_backend_total() {
        let mut backend = StubBackend::with_script(vec![]);
        backend.devices = 0;
        assert_eq!(count_with(&backend, DeviceVariant::Consumer), 0);
        backend.devices = 3;
        assert_eq!(count_with(&backend, DeviceVariant::Developer), 3);
    }

    #[test]
    fn test_count_never_fails() {
        let mut backend = StubBackend::with_script(vec![]);
        backend.refuse = true;
        assert_eq!(count_with(&backend, DeviceVariant::Consumer), 0);
    }

    #[test]
    fn test_open_binds_variant() {
        let backend = StubBackend::with_script(vec![]);
        let opts = OpenOptions::new(DeviceVariant::Developer).idle(IdlePolicy::Yield);
        let handle = DeviceHandle::open_with(&backend, &opts, stub_transform).unwrap();
        assert_eq!(handle.variant(), DeviceVariant::Developer);
        assert_eq!(handle.idle, IdlePolicy::Yield);
        assert_eq!(handle.serial(), Some("SN201211150798GM"));
        assert_eq!(handle.battery(), None);
        handle.close();
        assert!(backend.closed.get());
    }

    #[test]
    fn test_open_failure_yields_connection_error() {
        let mut backend = StubBackend::with_script(vec![]);
        backend.refuse = true;
        let opts = OpenOptions::new(DeviceVariant::Consumer);
        match DeviceHandle::open_with(&backend, &opts, stub_transform) {
            Err(e) => assert!(e.is_connection(), "{}", e),
            Ok(_) => panic!("open must fail"),
        }
        assert_eq!(backend.polls.get(), 0);
        assert!(!backend.closed.get());
    }

    #[test]
    fn test_open_without_device() {
        let mut backend = StubBackend::with_script(vec![]);
        backend.devices = 0;
        let opts = OpenOptions::new(DeviceVariant::Consumer);
        assert!(matches!(
            DeviceHandle::open_with(&backend, &opts, stub_transform),
            Err(EpocError::DeviceNotFound)
        ));
    }
}
