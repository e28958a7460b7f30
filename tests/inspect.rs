use usbdesc::capture::{CaptureFile, ReportCapture, StringCapture};
use usbdesc::decoder::Inspector;
use usbdesc::render::TextRenderer;
use usbdesc::settings::Settings;

const DEVICE: [u8; 18] = [
    0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40,
    0x34, 0x12, 0x78, 0x56, 0x00, 0x01, 0x01, 0x02, 0x00, 0x01];

const CONFIG: [u8; 34] = [
    0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0xA0, 0x32,
    0x09, 0x04, 0x00, 0x00, 0x01, 0x03, 0x01, 0x02, 0x00,
    0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x1C, 0x00,
    0x07, 0x05, 0x81, 0x03, 0x04, 0x00, 0x0A];

const REPORT: [u8; 28] = [
    0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x09, 0x01,
    0xA1, 0x00, 0x05, 0x09, 0x19, 0x01, 0x29, 0x03,
    0x15, 0x00, 0x25, 0x01, 0x95, 0x03, 0x75, 0x01,
    0x81, 0x02, 0xC0, 0xC0];

fn string(text: &str) -> Vec<u8> {
    let mut bytes = vec![(2 + text.len() * 2) as u8, 0x03];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn mouse() -> CaptureFile {
    CaptureFile {
        device: DEVICE.to_vec(),
        configurations: vec![CONFIG.to_vec()],
        hub: None,
        reports: vec![ReportCapture { interface: 0, index: 0, data: REPORT.to_vec() }],
        strings: vec![
            StringCapture { index: 0, language: 0, data: vec![0x04, 0x03, 0x09, 0x04] },
            StringCapture { index: 1, language: 0x0409, data: string("AB") },
            StringCapture { index: 2, language: 0x0409, data: string("Mouse") },
        ],
    }
}

fn listing(capture: CaptureFile, settings: Settings) -> String {
    let mut renderer = TextRenderer::new(Vec::new(), settings.clone());
    Inspector::new(capture, settings).run(&mut renderer).unwrap();
    String::from_utf8(renderer.into_inner()).unwrap()
}

#[test]
fn test_mouse_listing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mouse.json");
    mouse().save(&path).unwrap();
    let capture = CaptureFile::load(&path).unwrap();

    let text = listing(capture, Settings::default());

    assert!(text.starts_with("DEVICE descriptor:\n"));
    assert!(text.contains(
        "iManufacturer=1(AB) iProduct=2(Mouse) iSerialNumber=0() bNumConfigurations=1\n"));
    assert!(text.contains("\
CONFIGURATION descriptor 0:
bLength=9 bDescriptorType=config(2) wTotalLength=34 bNumInterface=1
bConfigurationValue=1 iConfiguration=0() bmAttributes=a0 bMaxPower=100 mA
"));
    assert!(text.contains("\
INTERFACE descriptor 0:
bLength=9 bDescriptorType=interface(4) bInterfaceNumber=0 bAlternateSetting=0
bNumEndpoints=1 bInterfaceClass=3 bInterfaceSubClass=1
bInterfaceProtocol=2 iInterface=0()
"));
    assert!(text.contains("\
HID descriptor:
bLength=9 bDescriptorType=cs_device(33) bcdHID=1.11 bCountryCode=0 bNumDescriptors=1
bDescriptorType[0]=cs_config(34), wDescriptorLength[0]=28
"));
    assert!(text.contains("\
Report descriptor
Usage Page(1)
Usage(2)
Collection (Application)
   Usage(1)
   Collection (Physical)
      Usage Page(9)
      Usage Min(1)
      Usage Max(3)
      Logical Min(0)
      Logical Max(1)
      Report count(3)
      Report size(1)
      Input (Data, Variable, Absolute, No wrap, Linear, Preferred state, \
No null position, Bit field)
   End Collection
End Collection

ENDPOINT descriptor:
"));
    assert!(text.ends_with("----------\n"));
}

#[test]
fn test_numeric_listing() {
    let settings = Settings {
        fetch_strings: false,
        show_reports: false,
        .. Settings::default()
    };
    let text = listing(mouse(), settings);
    assert!(text.contains("iManufacturer=1() iProduct=2()"));
    assert!(!text.contains("Report descriptor"));
    assert!(text.contains("HID descriptor:\n"));
}

#[test]
fn test_missing_report_is_listed() {
    let mut capture = mouse();
    capture.reports.clear();
    let text = listing(capture, Settings::default());
    assert!(text.contains("Failed to fetch report descriptor 0 of interface 0"));
    assert!(text.contains("ENDPOINT descriptor:\n"));
}

#[test]
fn test_malformed_configuration_is_listed() {
    let mut capture = mouse();
    capture.configurations[0][18] = 0;
    let text = listing(capture, Settings::default());
    assert!(text.contains("Error in configuration 0: "));
    assert!(!text.contains("HID descriptor:"));
    assert!(text.ends_with("----------\n"));
}
