// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cursor-on-Target XML encode/decode and the CoT type registry, grounded in
//! `original_source/src/engine/comms/cot_types/registry.py`.
//!
//! Every outbound target serializes through [`CotEvent::from_target`]; inbound
//! XML decodes through [`CotEvent::parse`], and [`cot_type_to_asset`] maps a
//! type code back to a unit type by exact match, then longest-prefix match.

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

use tritium_core::model::{unit_type, Alliance, AssetType, Target};

use crate::error::WireError;

/// How long a CoT event remains valid after `time`, absent overrides.
pub const DEFAULT_STALE_S: i64 = 60;

/// A CoT `<point>` element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CotPoint {
    pub lat: f64,
    pub lng: f64,
    pub hae: f64,
    pub ce: f64,
    pub le: f64,
}

impl CotPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64, hae: f64) -> Self {
        Self { lat, lng, hae, ce: 9_999_999.0, le: 9_999_999.0 }
    }
}

/// A parsed or to-be-serialized CoT event.
#[derive(Debug, Clone, PartialEq)]
pub struct CotEvent {
    pub uid: String,
    pub cot_type: String,
    pub how: String,
    pub time: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub stale: DateTime<Utc>,
    pub point: CotPoint,
    pub callsign: String,
    pub remarks: Option<String>,
    pub course: Option<f64>,
    pub speed: Option<f64>,
}

impl CotEvent {
    /// Build the outbound CoT event for a simulation target, staling out
    /// after [`DEFAULT_STALE_S`].
    #[must_use]
    pub fn from_target(target: &Target, point: CotPoint, now: DateTime<Utc>) -> Self {
        Self::from_target_with_stale(target, point, now, now + Duration::seconds(DEFAULT_STALE_S))
    }

    /// Build the outbound CoT event for a simulation target with an explicit
    /// `stale` timestamp, overriding the default stale window — used for the
    /// terminal event a bridge sends the instant a target is eliminated, so
    /// peers drop the icon immediately instead of waiting out the normal
    /// stale window.
    #[must_use]
    pub fn from_target_with_stale(target: &Target, point: CotPoint, now: DateTime<Utc>, stale: DateTime<Utc>) -> Self {
        let entry = unit_type(target.asset_type);
        let cot_type = swap_affiliation(entry.cot_type, target.alliance).unwrap_or_else(|| entry.cot_type.to_string());
        Self {
            uid: target.target_id.clone(),
            cot_type,
            how: "m-g".to_string(),
            time: now,
            start: now,
            stale,
            point,
            callsign: target.name.clone(),
            remarks: None,
            course: Some(target.heading),
            speed: Some(target.speed),
        }
    }

    /// Serialize to a CoT XML document.
    ///
    /// # Errors
    /// Returns [`WireError::Xml`] if the underlying writer fails.
    pub fn to_xml(&self) -> Result<String, WireError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut event = BytesStart::new("event");
        event.push_attribute(("version", "2.0"));
        event.push_attribute(("uid", self.uid.as_str()));
        event.push_attribute(("type", self.cot_type.as_str()));
        event.push_attribute(("how", self.how.as_str()));
        event.push_attribute(("time", self.time.to_rfc3339().as_str()));
        event.push_attribute(("start", self.start.to_rfc3339().as_str()));
        event.push_attribute(("stale", self.stale.to_rfc3339().as_str()));
        writer.write_event(Event::Start(event)).map_err(xml_err)?;

        let mut point = BytesStart::new("point");
        point.push_attribute(("lat", self.point.lat.to_string().as_str()));
        point.push_attribute(("lon", self.point.lng.to_string().as_str()));
        point.push_attribute(("hae", self.point.hae.to_string().as_str()));
        point.push_attribute(("ce", self.point.ce.to_string().as_str()));
        point.push_attribute(("le", self.point.le.to_string().as_str()));
        writer.write_event(Event::Empty(point)).map_err(xml_err)?;

        writer.write_event(Event::Start(BytesStart::new("detail"))).map_err(xml_err)?;

        let mut contact = BytesStart::new("contact");
        contact.push_attribute(("callsign", self.callsign.as_str()));
        writer.write_event(Event::Empty(contact)).map_err(xml_err)?;

        if let (Some(course), Some(speed)) = (self.course, self.speed) {
            let mut track = BytesStart::new("track");
            track.push_attribute(("course", course.to_string().as_str()));
            track.push_attribute(("speed", speed.to_string().as_str()));
            writer.write_event(Event::Empty(track)).map_err(xml_err)?;
        }

        if let Some(remarks) = &self.remarks {
            writer.write_event(Event::Start(BytesStart::new("remarks"))).map_err(xml_err)?;
            writer.write_event(Event::Text(BytesText::new(remarks))).map_err(xml_err)?;
            writer.write_event(Event::End(quick_xml::events::BytesEnd::new("remarks"))).map_err(xml_err)?;
        }

        writer.write_event(Event::End(quick_xml::events::BytesEnd::new("detail"))).map_err(xml_err)?;
        writer.write_event(Event::End(quick_xml::events::BytesEnd::new("event"))).map_err(xml_err)?;

        String::from_utf8(writer.into_inner().into_inner()).map_err(|e| WireError::Xml(e.to_string()))
    }

    /// Parse an inbound CoT XML document.
    ///
    /// # Errors
    /// Returns [`WireError::Xml`] on malformed XML or a missing required
    /// attribute/element.
    pub fn parse(xml: &str) -> Result<Self, WireError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut uid = None;
        let mut cot_type = None;
        let mut how = String::from("m-g");
        let mut time = None;
        let mut start = None;
        let mut stale = None;
        let mut point = None;
        let mut callsign = String::new();
        let mut remarks = None;
        let mut course = None;
        let mut speed = None;
        let mut in_remarks = false;

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).map_err(|e| WireError::Xml(e.to_string()))? {
                Event::Eof => break,
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"event" => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?.to_string();
                            match attr.key.as_ref() {
                                b"uid" => uid = Some(value),
                                b"type" => cot_type = Some(value),
                                b"how" => how = value,
                                b"time" => time = Some(parse_time(&value)?),
                                b"start" => start = Some(parse_time(&value)?),
                                b"stale" => stale = Some(parse_time(&value)?),
                                _ => {}
                            }
                        }
                    }
                    b"point" => {
                        let mut lat = 0.0;
                        let mut lng = 0.0;
                        let mut hae = 0.0;
                        let mut ce = 9_999_999.0;
                        let mut le = 9_999_999.0;
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?;
                            let parsed: f64 = value.parse().unwrap_or(0.0);
                            match attr.key.as_ref() {
                                b"lat" => lat = parsed,
                                b"lon" => lng = parsed,
                                b"hae" => hae = parsed,
                                b"ce" => ce = parsed,
                                b"le" => le = parsed,
                                _ => {}
                            }
                        }
                        point = Some(CotPoint { lat, lng, hae, ce, le });
                    }
                    b"contact" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"callsign" {
                                callsign = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?.to_string();
                            }
                        }
                    }
                    b"track" => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?;
                            match attr.key.as_ref() {
                                b"course" => course = value.parse().ok(),
                                b"speed" => speed = value.parse().ok(),
                                _ => {}
                            }
                        }
                    }
                    b"remarks" => in_remarks = true,
                    _ => {}
                },
                Event::Text(text) if in_remarks => {
                    remarks = Some(text.unescape().map_err(|e| WireError::Xml(e.to_string()))?.to_string());
                }
                Event::End(ref e) if e.local_name().as_ref() == b"remarks" => in_remarks = false,
                _ => {}
            }
            buf.clear();
        }

        let time = time.ok_or(WireError::MissingField("time"))?;
        Ok(Self {
            uid: uid.ok_or(WireError::MissingField("uid"))?,
            cot_type: cot_type.ok_or(WireError::MissingField("type"))?,
            how,
            time,
            start: start.unwrap_or(time),
            stale: stale.unwrap_or(time + Duration::seconds(DEFAULT_STALE_S)),
            point: point.ok_or(WireError::MissingField("point"))?,
            callsign,
            remarks,
            course,
            speed,
        })
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, WireError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(|e| WireError::Xml(e.to_string()))
}

fn xml_err(e: quick_xml::Error) -> WireError {
    WireError::Xml(e.to_string())
}

/// Swap the affiliation character of an atom CoT type code (`a-.-...`),
/// position 2, for the given alliance. Returns `None` for non-atom codes
/// (TAK-only codes, or codes shorter than 3 characters) — those are left
/// alone since there is no affiliation slot to swap.
#[must_use]
pub fn swap_affiliation(cot_type: &str, alliance: Alliance) -> Option<String> {
    if !cot_type.starts_with("a-") || cot_type.len() < 3 {
        return None;
    }
    let mut chars: Vec<char> = cot_type.chars().collect();
    chars[2] = alliance.cot_char();
    Some(chars.into_iter().collect())
}

/// Reverse-lookup a CoT type code to a unit type: exact match first, then
/// the longest registered prefix of `cot_type`.
#[must_use]
pub fn cot_type_to_asset(cot_type: &str) -> Option<AssetType> {
    const ALL: &[AssetType] = &[
        AssetType::Turret,
        AssetType::HeavyTurret,
        AssetType::MissileTurret,
        AssetType::Rover,
        AssetType::Drone,
        AssetType::ScoutDrone,
        AssetType::Tank,
        AssetType::Apc,
        AssetType::Person,
        AssetType::HostilePerson,
        AssetType::HostileLeader,
        AssetType::HostileVehicle,
        AssetType::Vehicle,
        AssetType::Animal,
        AssetType::Camera,
        AssetType::Sensor,
        AssetType::SwarmDrone,
    ];

    if let Some(asset) = ALL.iter().find(|a| unit_type(**a).cot_type == cot_type) {
        return Some(*asset);
    }

    ALL.iter()
        .filter(|a| cot_type.starts_with(unit_type(**a).cot_type))
        .max_by_key(|a| unit_type(**a).cot_type.len())
        .copied()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tritium_core::model::Position;

    fn sample_target() -> Target {
        Target::spawn("t-1", "Scout", Alliance::Friendly, AssetType::Rover, Position::new(10.0, 5.0), 0.0)
    }

    #[test]
    fn round_trips_uid_callsign_and_point() {
        let target = sample_target();
        let now = Utc::now();
        let event = CotEvent::from_target(&target, CotPoint::new(37.0, -122.0, 10.0), now);
        let xml = event.to_xml().expect("encode");
        let parsed = CotEvent::parse(&xml).expect("decode");

        assert_eq!(parsed.uid, target.target_id);
        assert_eq!(parsed.callsign, target.name);
        assert!((parsed.point.lat - 37.0).abs() < 1e-9);
        assert!((parsed.point.lng - (-122.0)).abs() < 1e-9);
        assert!((parsed.speed.expect("speed") - target.speed).abs() < 0.1);
    }

    #[test]
    fn swap_affiliation_only_touches_atom_codes() {
        assert_eq!(swap_affiliation("a-f-G-U-C", Alliance::Hostile), Some("a-h-G-U-C".to_string()));
        assert_eq!(swap_affiliation("b-m-p-s-p-i", Alliance::Hostile), None);
    }

    #[test]
    fn cot_type_to_asset_prefers_exact_match() {
        let rover_type = unit_type(AssetType::Rover).cot_type;
        assert_eq!(cot_type_to_asset(rover_type), Some(AssetType::Rover));
    }
}
