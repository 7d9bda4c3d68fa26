//! Datagram encoding and decoding for the control protocol.
//!
//! Wire format is OSC 1.0.  A datagram holds either one message or a bundle:
//!
//! ```text
//! message: [address, NUL-padded][",iifs", NUL-padded][arguments, 4-byte aligned]
//! bundle:  ["#bundle\0"][time tag: u32 seconds since 1900, u32 fraction][size, element]*
//! ```
//!
//! The byte-level work is done by `rosc`; this module decides what goes into
//! a packet (notably the bundle time tag) and flattens what comes out.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use super::ControlError;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Decodes one datagram into its messages, in order.
///
/// Bundles (including nested bundles) are flattened; their time tags are not
/// used on receipt.
///
/// # Errors
///
/// Returns [`ControlError::Decode`] if the datagram is not valid OSC.
pub fn decode_datagram(datagram: &[u8]) -> Result<Vec<OscMessage>, ControlError> {
    let (_rest, packet) = rosc::decoder::decode_udp(datagram)
        .map_err(|e| ControlError::Decode(format!("{e:?}")))?;
    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

/// Builds a single-message packet.
pub fn message_packet(address: impl Into<String>, args: Vec<OscType>) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: address.into(),
        args,
    })
}

/// Builds a bundle time-tagged `delay_secs` after `now`.
///
/// The receiver executes the bundle at that instant; nothing is delayed
/// locally.  A negative or non-finite delay tags the bundle with `now`.
pub fn bundle_packet(delay_secs: f64, messages: Vec<OscMessage>, now: SystemTime) -> OscPacket {
    let delay = if delay_secs.is_finite() && delay_secs > 0.0 {
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    };
    let fire_at = now.checked_add(delay).unwrap_or(now);

    OscPacket::Bundle(OscBundle {
        timetag: osc_time(fire_at),
        content: messages.into_iter().map(OscPacket::Message).collect(),
    })
}

/// Encodes a packet for transmission.
///
/// # Errors
///
/// Returns [`ControlError::Encode`] if `rosc` refuses the packet.
pub fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>, ControlError> {
    rosc::encoder::encode(packet).map_err(|e| ControlError::Encode(format!("{e:?}")))
}

/// Converts a wall-clock instant to an NTP time tag.
///
/// Instants before the Unix epoch clamp to the epoch.  The seconds field
/// wraps at the NTP era boundary, as the format requires.
pub fn osc_time(at: SystemTime) -> OscTime {
    let since_unix = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let seconds = (since_unix.as_secs() + NTP_UNIX_OFFSET_SECS) as u32;
    let fractional = ((u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000) as u32;
    OscTime {
        seconds,
        fractional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc_time_at_unix_epoch() {
        let t = osc_time(UNIX_EPOCH);
        assert_eq!(t.seconds, NTP_UNIX_OFFSET_SECS as u32);
        assert_eq!(t.fractional, 0);
    }

    #[test]
    fn test_osc_time_half_second_is_half_fraction() {
        let t = osc_time(UNIX_EPOCH + Duration::from_millis(1500));
        assert_eq!(t.seconds, NTP_UNIX_OFFSET_SECS as u32 + 1);
        assert_eq!(t.fractional, 1 << 31);
    }

    #[test]
    fn test_bundle_is_tagged_in_the_future() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let packet = bundle_packet(60.0, vec![], now);

        let OscPacket::Bundle(bundle) = packet else {
            panic!("expected bundle");
        };
        assert_eq!(
            bundle.timetag.seconds,
            (1_060 + NTP_UNIX_OFFSET_SECS) as u32
        );
    }

    #[test]
    fn test_bundle_with_negative_or_nan_delay_is_tagged_now() {
        let now = UNIX_EPOCH + Duration::from_secs(500);
        for delay in [-5.0, f64::NAN, f64::INFINITY] {
            let OscPacket::Bundle(bundle) = bundle_packet(delay, vec![], now) else {
                panic!("expected bundle");
            };
            assert_eq!(bundle.timetag, osc_time(now), "delay {delay}");
        }
    }

    #[test]
    fn test_bundle_keeps_message_order() {
        let messages = vec![
            OscMessage {
                addr: "/cmd/yes".to_string(),
                args: vec![OscType::Float(1.0)],
            },
            OscMessage {
                addr: "/cmd/somethingelse".to_string(),
                args: vec![OscType::String("hello".to_string())],
            },
        ];

        let bytes = encode_packet(&bundle_packet(1.0, messages.clone(), SystemTime::now()))
            .expect("encode");
        let decoded = decode_datagram(&bytes).expect("decode");

        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_decode_single_message() {
        let bytes = encode_packet(&message_packet(
            "/press/bank/1/2",
            vec![OscType::Int(1)],
        ))
        .unwrap();

        let decoded = decode_datagram(&bytes).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].addr, "/press/bank/1/2");
        assert_eq!(decoded[0].args, vec![OscType::Int(1)]);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result = decode_datagram(b"\x01\x02not osc");
        assert!(matches!(result, Err(ControlError::Decode(_))));
    }
}
