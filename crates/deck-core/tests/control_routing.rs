//! Integration tests for control-message routing.
//!
//! Each test encodes a real datagram with the public packet helpers, decodes
//! it again, and routes every message, the same path a received datagram
//! takes through the listener.

use std::time::SystemTime;

use deck_core::protocol::{
    bundle_packet, decode_datagram, encode_packet, message_packet, route_message, ControlAction,
    OscMessage, OscType,
};
use deck_core::StyleChange;

/// Encodes a single message, decodes it, and routes it.
fn route_wire(address: &str, args: Vec<OscType>) -> Option<ControlAction> {
    let bytes = encode_packet(&message_packet(address, args)).expect("encode must succeed");
    let messages = decode_datagram(&bytes).expect("decode must succeed");
    assert_eq!(messages.len(), 1);
    route_message(&messages[0])
}

#[test]
fn test_trigger_from_wire() {
    assert_eq!(
        route_wire("/press/bank/3/7", vec![]),
        Some(ControlAction::Trigger { bank: 3, button: 7 })
    );
}

#[test]
fn test_press_and_release_from_wire() {
    assert_eq!(
        route_wire("/press/bank/0/31", vec![OscType::Int(1)]),
        Some(ControlAction::Press {
            bank: 0,
            button: 31,
            pressed: true
        })
    );
    assert_eq!(
        route_wire("/press/bank/0/31", vec![OscType::Int(0)]),
        Some(ControlAction::Press {
            bank: 0,
            button: 31,
            pressed: false
        })
    );
}

#[test]
fn test_bgcolor_from_wire() {
    assert_eq!(
        route_wire(
            "/style/bgcolor/2/1",
            vec![OscType::Int(255), OscType::Int(0), OscType::Int(128)]
        ),
        Some(ControlAction::SetStyle {
            bank: 2,
            button: 1,
            style: StyleChange::BgColor(0xFF0080)
        })
    );
}

#[test]
fn test_trailing_arguments_are_ignored() {
    assert_eq!(
        route_wire(
            "/style/color/1/1",
            vec![
                OscType::Int(1),
                OscType::Int(2),
                OscType::Int(3),
                OscType::String("extra".into())
            ]
        ),
        Some(ControlAction::SetStyle {
            bank: 1,
            button: 1,
            style: StyleChange::Color(0x010203)
        })
    );
}

#[test]
fn test_text_with_non_string_argument_is_dropped() {
    assert_eq!(route_wire("/style/text/9/9", vec![OscType::Int(5)]), None);
}

#[test]
fn test_unknown_address_is_dropped() {
    assert_eq!(route_wire("/custom/thing", vec![OscType::Int(1)]), None);
}

#[test]
fn test_bundle_messages_route_in_order() {
    // Arrange
    let messages = vec![
        OscMessage {
            addr: "/press/bank/1/1".to_string(),
            args: vec![OscType::Int(1)],
        },
        OscMessage {
            addr: "/unknown".to_string(),
            args: vec![],
        },
        OscMessage {
            addr: "/style/text/1/1".to_string(),
            args: vec![OscType::String("hi".to_string())],
        },
    ];
    let bytes = encode_packet(&bundle_packet(0.0, messages, SystemTime::now())).unwrap();

    // Act
    let actions: Vec<ControlAction> = decode_datagram(&bytes)
        .unwrap()
        .iter()
        .filter_map(route_message)
        .collect();

    // Assert
    assert_eq!(
        actions,
        vec![
            ControlAction::Press {
                bank: 1,
                button: 1,
                pressed: true
            },
            ControlAction::SetStyle {
                bank: 1,
                button: 1,
                style: StyleChange::Text("hi".to_string())
            },
        ]
    );
}
