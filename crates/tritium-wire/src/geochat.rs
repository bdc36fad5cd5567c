// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! GeoChat: TAK's chat-over-CoT message type (`b-t-f`), used for inbound
//! operator messages and outbound status text.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

use crate::cot::{CotPoint, DEFAULT_STALE_S};
use crate::error::WireError;

/// The CoT type code for a GeoChat message.
pub const GEOCHAT_COT_TYPE: &str = "b-t-f";

/// A single GeoChat message.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoChatMessage {
    pub message_id: String,
    pub sender_uid: String,
    pub sender_callsign: String,
    pub chatroom: String,
    pub text: String,
    pub time: DateTime<Utc>,
    pub point: CotPoint,
}

impl GeoChatMessage {
    /// # Errors
    /// Returns [`WireError::Xml`] if the underlying writer fails.
    pub fn to_xml(&self) -> Result<String, WireError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut event = BytesStart::new("event");
        event.push_attribute(("version", "2.0"));
        event.push_attribute(("uid", self.message_id.as_str()));
        event.push_attribute(("type", GEOCHAT_COT_TYPE));
        event.push_attribute(("how", "h-g-i-g-o"));
        event.push_attribute(("time", self.time.to_rfc3339().as_str()));
        event.push_attribute(("start", self.time.to_rfc3339().as_str()));
        let stale = self.time + chrono::Duration::seconds(DEFAULT_STALE_S);
        event.push_attribute(("stale", stale.to_rfc3339().as_str()));
        writer.write_event(Event::Start(event)).map_err(xml_err)?;

        let mut point = BytesStart::new("point");
        point.push_attribute(("lat", self.point.lat.to_string().as_str()));
        point.push_attribute(("lon", self.point.lng.to_string().as_str()));
        point.push_attribute(("hae", self.point.hae.to_string().as_str()));
        point.push_attribute(("ce", self.point.ce.to_string().as_str()));
        point.push_attribute(("le", self.point.le.to_string().as_str()));
        writer.write_event(Event::Empty(point)).map_err(xml_err)?;

        writer.write_event(Event::Start(BytesStart::new("detail"))).map_err(xml_err)?;

        let mut chat = BytesStart::new("__chat");
        chat.push_attribute(("chatroom", self.chatroom.as_str()));
        chat.push_attribute(("senderCallsign", self.sender_callsign.as_str()));
        writer.write_event(Event::Empty(chat)).map_err(xml_err)?;

        let mut link = BytesStart::new("link");
        link.push_attribute(("uid", self.sender_uid.as_str()));
        link.push_attribute(("relation", "p-p"));
        writer.write_event(Event::Empty(link)).map_err(xml_err)?;

        writer.write_event(Event::Start(BytesStart::new("remarks"))).map_err(xml_err)?;
        writer.write_event(Event::Text(BytesText::new(&self.text))).map_err(xml_err)?;
        writer.write_event(Event::End(quick_xml::events::BytesEnd::new("remarks"))).map_err(xml_err)?;

        writer.write_event(Event::End(quick_xml::events::BytesEnd::new("detail"))).map_err(xml_err)?;
        writer.write_event(Event::End(quick_xml::events::BytesEnd::new("event"))).map_err(xml_err)?;

        String::from_utf8(writer.into_inner().into_inner()).map_err(|e| WireError::Xml(e.to_string()))
    }

    /// # Errors
    /// Returns [`WireError::Xml`] on malformed XML or a missing field, and
    /// `WireError::UnknownCotType` if the event isn't a GeoChat message.
    pub fn parse(xml: &str) -> Result<Self, WireError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut message_id = None;
        let mut cot_type = None;
        let mut time = None;
        let mut point = None;
        let mut chatroom = String::new();
        let mut sender_callsign = String::new();
        let mut sender_uid = String::new();
        let mut text = String::new();
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
                                b"uid" => message_id = Some(value),
                                b"type" => cot_type = Some(value),
                                b"time" => {
                                    time = Some(
                                        DateTime::parse_from_rfc3339(&value)
                                            .map(|dt| dt.with_timezone(&Utc))
                                            .map_err(|e| WireError::Xml(e.to_string()))?,
                                    );
                                }
                                _ => {}
                            }
                        }
                    }
                    b"point" => {
                        let mut lat = 0.0;
                        let mut lng = 0.0;
                        let mut hae = 0.0;
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?;
                            let parsed: f64 = value.parse().unwrap_or(0.0);
                            match attr.key.as_ref() {
                                b"lat" => lat = parsed,
                                b"lon" => lng = parsed,
                                b"hae" => hae = parsed,
                                _ => {}
                            }
                        }
                        point = Some(CotPoint::new(lat, lng, hae));
                    }
                    b"__chat" => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?.to_string();
                            match attr.key.as_ref() {
                                b"chatroom" => chatroom = value,
                                b"senderCallsign" => sender_callsign = value,
                                _ => {}
                            }
                        }
                    }
                    b"link" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"uid" {
                                sender_uid = attr.unescape_value().map_err(|e| WireError::Xml(e.to_string()))?.to_string();
                            }
                        }
                    }
                    b"remarks" => in_remarks = true,
                    _ => {}
                },
                Event::Text(t) if in_remarks => {
                    text = t.unescape().map_err(|e| WireError::Xml(e.to_string()))?.to_string();
                }
                Event::End(ref e) if e.local_name().as_ref() == b"remarks" => in_remarks = false,
                _ => {}
            }
            buf.clear();
        }

        let cot_type = cot_type.ok_or(WireError::MissingField("type"))?;
        if cot_type != GEOCHAT_COT_TYPE {
            return Err(WireError::UnknownCotType(cot_type));
        }

        Ok(Self {
            message_id: message_id.ok_or(WireError::MissingField("uid"))?,
            sender_uid,
            sender_callsign,
            chatroom,
            text,
            time: time.ok_or(WireError::MissingField("time"))?,
            point: point.ok_or(WireError::MissingField("point"))?,
        })
    }
}

fn xml_err(e: quick_xml::Error) -> WireError {
    WireError::Xml(e.to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_sender_and_text() {
        let message = GeoChatMessage {
            message_id: "msg-1".to_string(),
            sender_uid: "op-1".to_string(),
            sender_callsign: "Overwatch".to_string(),
            chatroom: "All Chat Rooms".to_string(),
            text: "contact east ridge".to_string(),
            time: Utc::now(),
            point: CotPoint::new(37.0, -122.0, 0.0),
        };
        let xml = message.to_xml().expect("encode");
        let parsed = GeoChatMessage::parse(&xml).expect("decode");
        assert_eq!(parsed.text, message.text);
        assert_eq!(parsed.sender_callsign, message.sender_callsign);
        assert_eq!(parsed.chatroom, message.chatroom);
    }

    #[test]
    fn parse_rejects_non_geochat_events() {
        let xml = r#"<event version="2.0" uid="u" type="a-f-G" time="2024-01-01T00:00:00Z" start="2024-01-01T00:00:00Z" stale="2024-01-01T00:01:00Z"><point lat="0" lon="0" hae="0" ce="0" le="0"/></event>"#;
        assert!(GeoChatMessage::parse(xml).is_err());
    }
}
