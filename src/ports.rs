//! Serial port discovery for `--list-ports`

use colored::*;
use tokio_serial::{SerialPortInfo, SerialPortType};

/// FTDI vendor id; USB WinKeyers (WKUSB, WK3) enumerate as FTDI bridges.
const FTDI_VID: u16 = 0x0403;

/// Human readable kind of a port, and whether it looks like a WinKeyer.
fn describe_port(port_type: &SerialPortType) -> (String, bool) {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb
                .product
                .clone()
                .or_else(|| usb.manufacturer.clone())
                .unwrap_or_else(|| "USB serial".to_string());
            (
                format!("{} ({:04x}:{:04x})", product, usb.vid, usb.pid),
                usb.vid == FTDI_VID,
            )
        }
        SerialPortType::PciPort => ("PCI".to_string(), false),
        SerialPortType::BluetoothPort => ("Bluetooth".to_string(), false),
        SerialPortType::Unknown => ("unknown".to_string(), false),
    }
}

fn print_ports(ports: &[SerialPortInfo]) {
    println!("\n{}", "=== Available Serial Ports ===".bold().cyan());

    if ports.is_empty() {
        println!("  {}", "No serial ports found".dimmed());
        println!();
        return;
    }

    for port in ports {
        let (kind, likely_keyer) = describe_port(&port.port_type);
        let marker = if likely_keyer {
            "[FTDI]".green()
        } else {
            "[OTHER]".yellow()
        };
        println!("  {} {} {}", marker, port.port_name.bright_white(), kind.dimmed());
    }

    println!();
}

/// List serial ports in a formatted way
pub fn list_ports_formatted() {
    match tokio_serial::available_ports() {
        Ok(ports) => print_ports(&ports),
        Err(e) => eprintln!("{} {}", "Failed to enumerate serial ports:".red(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::UsbPortInfo;

    fn usb(vid: u16, product: Option<&str>) -> SerialPortType {
        SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid: 0x6001,
            serial_number: None,
            manufacturer: Some("FTDI".to_string()),
            product: product.map(str::to_string),
        })
    }

    #[test]
    fn test_describe_ftdi_port() {
        let (kind, likely_keyer) = describe_port(&usb(FTDI_VID, Some("FT232R USB UART")));
        assert_eq!(kind, "FT232R USB UART (0403:6001)");
        assert!(likely_keyer);
    }

    #[test]
    fn test_describe_other_ports() {
        let (kind, likely_keyer) = describe_port(&usb(0x10c4, None));
        assert_eq!(kind, "FTDI (10c4:6001)");
        assert!(!likely_keyer);

        assert_eq!(describe_port(&SerialPortType::PciPort), ("PCI".to_string(), false));
    }

    #[test]
    fn test_print_empty_list_does_not_panic() {
        print_ports(&[]);
    }
}
