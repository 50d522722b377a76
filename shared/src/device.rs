/*!
Device identity and address encoding.

A device id packs the USB vendor id in the high 16 bits and the product id in
the low 16 bits. An address packs the bus number in bits 23:16 and the device
number in bits 15:8; the low byte is left to the host.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor/product code of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// USB vendor id
    pub fn vendor(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// USB product id
    pub fn product(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor(), self.product())
    }
}

/// Bus/device locator of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u32);

impl Address {
    /// Build an address from a bus number and a device number
    pub fn from_bus_device(bus: u8, device: u8) -> Self {
        Self(((bus as u32) << 16) | ((device as u32) << 8))
    }

    /// USB bus number
    pub fn bus(self) -> u8 {
        ((self.0 & 0x00FF_0000) >> 16) as u8
    }

    /// USB device number on the bus
    pub fn device(self) -> u8 {
        ((self.0 & 0x0000_FF00) >> 8) as u8
    }

    /// Rebuild the hidapi path (`bbbb:dddd:ii`) for the given interface
    pub fn hid_path(self, interface: u8) -> String {
        format!("{:04x}:{:04x}:{:02x}", self.bus(), self.device(), interface)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Identity of a running instance; at most one instance exists per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    pub id: DeviceId,
    pub address: Address,
}

impl DeviceKey {
    pub fn new(id: u32, address: u32) -> Self {
        Self {
            id: DeviceId(id),
            address: Address(address),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

/// Entry of a driver's supported device table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedDevice {
    pub id: DeviceId,
    /// Interface number used to rebuild HID paths
    pub interface: u8,
    pub name: &'static str,
}

impl SupportedDevice {
    pub const fn new(id: u32, interface: u8, name: &'static str) -> Self {
        Self {
            id: DeviceId(id),
            interface,
            name,
        }
    }
}

/// Look up the interface number for a device id, 0 when unknown
pub fn interface_for(id: DeviceId, table: &[SupportedDevice]) -> u8 {
    table
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.interface)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_fields() {
        let address = Address(0x0003_0700);
        assert_eq!(address.bus(), 3);
        assert_eq!(address.device(), 7);
        assert_eq!(Address::from_bus_device(3, 7), address);
    }

    #[test]
    fn test_hid_path() {
        let address = Address::from_bus_device(0x01, 0x1a);
        assert_eq!(address.hid_path(0), "0001:001a:00");
        assert_eq!(address.hid_path(2), "0001:001a:02");
    }

    #[test]
    fn test_device_id_display() {
        let id = DeviceId(0x10c4ea60);
        assert_eq!(id.vendor(), 0x10c4);
        assert_eq!(id.product(), 0xea60);
        assert_eq!(id.to_string(), "10c4:ea60");
    }

    #[test]
    fn test_interface_lookup() {
        let table = [
            SupportedDevice::new(0x0b8c0083, 0, "Smart Slate WS200"),
            SupportedDevice::new(0x26501311, 1, "eBeam Classic"),
        ];
        assert_eq!(interface_for(DeviceId(0x26501311), &table), 1);
        assert_eq!(interface_for(DeviceId(0xdeadbeef), &table), 0);
    }
}
