// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CoT round-trip and GeoChat inbound scenarios spanning the wire codecs
//! and the unit-type registry's reverse CoT-type lookup.

use chrono::Utc;
use tritium_core::model::{unit_type, Alliance, AssetType, Position, Target};
use tritium_wire::cot::{cot_type_to_asset, CotEvent, CotPoint};
use tritium_wire::geochat::GeoChatMessage;

#[test]
fn cot_round_trip_recovers_alliance_asset_and_kinematics() {
    let target = Target::spawn("rover-9", "Alpha", Alliance::Friendly, AssetType::Rover, Position::new(0.0, 0.0), 0.0);
    let mut target = target;
    target.heading = 45.0;
    target.speed = 1.5;

    let now = Utc::now();
    let point = CotPoint::new(37.7751, -122.4192, 0.0);
    let event = CotEvent::from_target(&target, point, now);

    let xml = event.to_xml().expect("encode");
    let parsed = CotEvent::parse(&xml).expect("decode");

    assert_eq!(parsed.uid, "rover-9");
    assert!((parsed.point.lat - 37.7751).abs() < 1e-6);
    assert!((parsed.point.lng - (-122.4192)).abs() < 1e-6);
    assert!((parsed.course.expect("course") - 45.0).abs() < 0.1);
    assert!((parsed.speed.expect("speed") - 1.5).abs() < 0.1);

    let recovered = cot_type_to_asset(&parsed.cot_type).expect("known cot type");
    assert_eq!(recovered, AssetType::Rover);
    assert_eq!(unit_type(recovered).type_id, AssetType::Rover);
}

#[test]
fn geochat_inbound_is_tagged_with_sender_and_room() {
    let message = GeoChatMessage {
        message_id: "geochat-1".to_string(),
        sender_uid: "op-alpha".to_string(),
        sender_callsign: "Alpha".to_string(),
        chatroom: "All Chat Rooms".to_string(),
        text: "contact at grid 12TWK".to_string(),
        time: Utc::now(),
        point: CotPoint::new(37.7751, -122.4192, 0.0),
    };

    let xml = message.to_xml().expect("encode");
    let parsed = GeoChatMessage::parse(&xml).expect("decode");

    assert_eq!(parsed.sender_callsign, "Alpha");
    assert_eq!(parsed.text, "contact at grid 12TWK");
    assert_eq!(parsed.chatroom, "All Chat Rooms");
}
