use heapless::Vec;

/// Legacy advertising PDUs carry at most 31 bytes of AD structures.
pub const ADV_PAYLOAD_MAX: usize = 31;

const AD_FLAGS: u8 = 0x01;
const AD_COMPLETE_NAME: u8 = 0x09;

/// LE General Discoverable, BR/EDR not supported.
const FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

/// Build the advertising payload: flags, then the complete local name.
///
/// Service UUIDs are left out to keep the payload short. Names too long for
/// the remaining space are cut to fit.
pub fn advertising_payload(name: &str) -> Vec<u8, ADV_PAYLOAD_MAX> {
    let mut payload = Vec::new();
    push_structure(&mut payload, AD_FLAGS, &[FLAGS_GENERAL_DISCOVERABLE]);
    if !name.is_empty() {
        let room = ADV_PAYLOAD_MAX - payload.len() - 2;
        let bytes = name.as_bytes();
        push_structure(&mut payload, AD_COMPLETE_NAME, &bytes[..bytes.len().min(room)]);
    }
    payload
}

fn push_structure(payload: &mut Vec<u8, ADV_PAYLOAD_MAX>, ad_type: u8, value: &[u8]) {
    let _ = payload.push(value.len() as u8 + 1);
    let _ = payload.push(ad_type);
    let _ = payload.extend_from_slice(value);
}
