/*!
Driver families.

A [`DriverKind`] bundles everything static about one family: its supported
device table, its parameters with their defaults, how its devices are
reached, and which decoder handles them.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::device::interface_for;
use shared::{DeviceId, DeviceKey, DriverError, ParamSpec, ParameterTable, SupportedDevice};

use crate::options::DriverOptions;
use crate::protocol::dvit::{self, DvitDecoder};
use crate::protocol::iqboard::{self, IqBoardDecoder};
use crate::protocol::multiclass::{self, MulticlassDecoder};
use crate::protocol::promethean::{self, PrometheanDecoder};
use crate::protocol::tablet::{self, TabletDecoder, TabletModel};
use crate::protocol::whiteboard::{self, BoardState, WhiteBoardDecoder};
use crate::protocol::ProtocolDecoder;
use crate::transport::TransportKind;

const IQBOARD_DEVICES: &[SupportedDevice] = &[SupportedDevice::new(0x10c4ea60, 0, "IQBoard")];

const MULTICLASS_DEVICES: &[SupportedDevice] =
    &[SupportedDevice::new(0x10c4ea60, 0, "Multiclass")];

const PROMETHEAN_DEVICES: &[SupportedDevice] =
    &[SupportedDevice::new(0x0d480001, 0, "Promethean ActiveBoard")];

const TABLET_DEVICES: &[SupportedDevice] = &[
    SupportedDevice::new(tablet::SLATE_ID, 0, "Smart Slate WS200"),
    SupportedDevice::new(tablet::FLEX_ID, 0, "Trust Flex Design"),
    SupportedDevice::new(tablet::SILVERCREST_ID, 0, "Silvercrest"),
    SupportedDevice::new(tablet::MOUSEPEN_ID, 0, "Genius Mousepen"),
    SupportedDevice::new(tablet::MOBI_ID, 0, "Interwrite Mobi"),
];

const WHITEBOARD_DEVICES: &[SupportedDevice] = &[
    SupportedDevice::new(whiteboard::EBEAM_ID, 0, "eBeam Classic"),
    SupportedDevice::new(whiteboard::SMART_ID, 0, "Smart Board"),
    SupportedDevice::new(whiteboard::TEAMBOARD_ID, 0, "Team Board"),
];

const DVIT_DEVICES: &[SupportedDevice] = &[SupportedDevice::new(dvit::DVIT_ID, 0, "Smart DViT v280")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    IqBoard,
    Multiclass,
    Promethean,
    Tablet,
    WhiteBoard,
    Dvit,
}

impl DriverKind {
    pub const ALL: [DriverKind; 6] = [
        Self::IqBoard,
        Self::Multiclass,
        Self::Promethean,
        Self::Tablet,
        Self::WhiteBoard,
        Self::Dvit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::IqBoard => "IQBoard driver",
            Self::Multiclass => "Multiclass driver",
            Self::Promethean => "Promethean ActiveBoard driver",
            Self::Tablet => "Tablet driver",
            Self::WhiteBoard => "WhiteBoard driver",
            Self::Dvit => "Smart DViT driver",
        }
    }

    pub fn version(self) -> &'static str {
        match self {
            Self::WhiteBoard => "2.1",
            _ => "2.0-alpha1",
        }
    }

    /// Short lowercase tag, as used in configuration files and thread names
    pub fn tag(self) -> &'static str {
        match self {
            Self::IqBoard => "iqboard",
            Self::Multiclass => "multiclass",
            Self::Promethean => "promethean",
            Self::Tablet => "tablet",
            Self::WhiteBoard => "whiteboard",
            Self::Dvit => "dvit",
        }
    }

    pub fn supported_devices(self) -> &'static [SupportedDevice] {
        match self {
            Self::IqBoard => IQBOARD_DEVICES,
            Self::Multiclass => MULTICLASS_DEVICES,
            Self::Promethean => PROMETHEAN_DEVICES,
            Self::Tablet => TABLET_DEVICES,
            Self::WhiteBoard => WHITEBOARD_DEVICES,
            Self::Dvit => DVIT_DEVICES,
        }
    }

    /// Family parameters with their defaults; `common.debug` is implied
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            Self::IqBoard => iqboard::PARAMETERS,
            Self::Multiclass => multiclass::PARAMETERS,
            Self::Promethean => promethean::PARAMETERS,
            Self::Tablet => tablet::PARAMETERS,
            Self::WhiteBoard => whiteboard::PARAMETERS,
            Self::Dvit => dvit::PARAMETERS,
        }
    }

    pub fn supports(self, id: DeviceId) -> bool {
        self.supported_devices().iter().any(|device| device.id == id)
    }

    /// Resolve how to reach the device behind `key`
    pub fn transport_for(
        self,
        key: DeviceKey,
        params: &ParameterTable,
        options: &DriverOptions,
    ) -> TransportKind {
        let serial = |tty_key: &str, baud_rate: u32| TransportKind::Serial {
            path: format!("{}{}", options.serial_prefix, params.get_or(tty_key, 0)),
            baud_rate,
        };

        match self {
            Self::IqBoard => serial(iqboard::TTY_PARAMETER, iqboard::BAUD_RATE),
            Self::Multiclass => serial(multiclass::TTY_PARAMETER, multiclass::BAUD_RATE),
            Self::Promethean => TransportKind::UsbInterrupt {
                bus: key.address.bus(),
                device: key.address.device(),
                interface: promethean::INTERFACE,
                endpoint: promethean::ENDPOINT_IN,
            },
            Self::Tablet | Self::WhiteBoard => TransportKind::Hid {
                path: key
                    .address
                    .hid_path(interface_for(key.id, self.supported_devices())),
            },
            Self::Dvit => TransportKind::CameraPair,
        }
    }

    /// Fresh decoder for one instance, `None` for ids outside this family
    pub fn decoder(self, id: DeviceId, options: &DriverOptions) -> Option<Box<dyn ProtocolDecoder>> {
        if !self.supports(id) {
            return None;
        }
        let decoder: Box<dyn ProtocolDecoder> = match self {
            Self::IqBoard => Box::new(IqBoardDecoder::new()),
            Self::Multiclass => Box::new(MulticlassDecoder::new(options.serial_settle)),
            Self::Promethean => Box::new(PrometheanDecoder::new()),
            Self::Tablet => Box::new(TabletDecoder::new(TabletModel::from_id(id)?)),
            Self::WhiteBoard => Box::new(WhiteBoardDecoder::new(BoardState::for_id(id)?)),
            Self::Dvit => Box::new(DvitDecoder::new()),
        };
        Some(decoder)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DriverKind {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| DriverError::config(format!("unknown driver kind '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Address;

    #[test]
    fn test_every_device_has_a_decoder() {
        let options = DriverOptions::default();
        for kind in DriverKind::ALL {
            for device in kind.supported_devices() {
                assert!(kind.decoder(device.id, &options).is_some(), "{} {}", kind, device.name);
            }
            assert!(kind.decoder(DeviceId(0xdeadbeef), &options).is_none());
        }
    }

    #[test]
    fn test_shared_serial_id_resolves_per_driver() {
        let params = ParameterTable::with_defaults(DriverKind::Multiclass.parameters());
        params.set("multiclass.tty", 2);
        let key = DeviceKey::new(0x10c4ea60, 0);

        let transport = DriverKind::Multiclass.transport_for(key, &params, &DriverOptions::default());
        assert_eq!(
            transport,
            TransportKind::Serial {
                path: "/dev/ttyUSB2".to_string(),
                baud_rate: 9600
            }
        );

        let params = ParameterTable::with_defaults(DriverKind::IqBoard.parameters());
        let transport = DriverKind::IqBoard.transport_for(key, &params, &DriverOptions::default());
        assert_eq!(
            transport,
            TransportKind::Serial {
                path: "/dev/ttyUSB0".to_string(),
                baud_rate: 19200
            }
        );
    }

    #[test]
    fn test_hid_and_usb_addresses() {
        let address = Address::from_bus_device(3, 7);
        let key = DeviceKey {
            id: DeviceId(whiteboard::SMART_ID),
            address,
        };
        let params = ParameterTable::with_defaults(&[]);
        let options = DriverOptions::default();

        assert_eq!(
            DriverKind::WhiteBoard.transport_for(key, &params, &options),
            TransportKind::Hid {
                path: "0003:0007:00".to_string()
            }
        );
        assert_eq!(
            DriverKind::Promethean.transport_for(key, &params, &options),
            TransportKind::UsbInterrupt {
                bus: 3,
                device: 7,
                interface: 0,
                endpoint: 0x81
            }
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("WhiteBoard".parse::<DriverKind>().unwrap(), DriverKind::WhiteBoard);
        assert!("joystick".parse::<DriverKind>().is_err());
    }
}
