use crate::protocol::HID_INTERFACE;
use crate::types::DeviceVariant;

/// What the blocking wait does between empty polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdlePolicy {
    /// Busy-poll with a CPU spin hint.
    #[default]
    Spin,
    /// Give the rest of the time slice to other threads.
    Yield,
}

/// Settings fixed when a device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub variant: DeviceVariant,
    /// HID interface carrying sensor reports.
    pub interface: i32,
    pub idle: IdlePolicy,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new(DeviceVariant::default())
    }
}

impl OpenOptions {
    pub fn new(variant: DeviceVariant) -> Self {
        Self {
            variant,
            interface: HID_INTERFACE,
            idle: IdlePolicy::default(),
        }
    }

    pub fn idle(mut self, idle: IdlePolicy) -> Self {
        self.idle = idle;
        self
    }

    /// Defaults overridden by `EPOC_VARIANT`, `EPOC_HID_INTERFACE` and
    /// `EPOC_YIELD_WHEN_IDLE`. Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let variant = lookup("EPOC_VARIANT")
            .and_then(|v| {
                let parsed = DeviceVariant::from_name(&v);
                if parsed.is_none() {
                    log::warn!(
                        "Unknown EPOC_VARIANT='{}', using {:?} (supported: consumer|developer)",
                        v,
                        defaults.variant
                    );
                }
                parsed
            })
            .unwrap_or(defaults.variant);

        let interface = lookup("EPOC_HID_INTERFACE")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(defaults.interface);

        let idle = match lookup("EPOC_YIELD_WHEN_IDLE").as_deref().and_then(parse_bool) {
            Some(true) => IdlePolicy::Yield,
            Some(false) => IdlePolicy::Spin,
            None => defaults.idle,
        };

        Self {
            variant,
            interface,
            idle,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
