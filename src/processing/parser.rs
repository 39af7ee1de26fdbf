//! Packet parser
//!
//! A packet is a comma-separated list of tokens; the first character of a
//! token is its tag and the rest is a float. Tags:
//!
//! | Tag | Field                  |
//! |-----|------------------------|
//! | `A` | gyro x                 |
//! | `B` | gyro y                 |
//! | `C` | gyro z                 |
//! | `D` | flex 0 (pinky)         |
//! | `E` | flex 1 (ring)          |
//! | `F` | flex 2 (middle)        |
//! | `G` | flex 3 (index)         |
//! | `H` | flex 4 (thumb)         |
//! | `T` | hardware timestamp, us |
//!
//! Parsing never fails. Short tokens, unknown tags and unparseable values
//! are skipped and the field keeps its zero default.

use crate::types::{RawSample, SampleField};

/// Tag character to field dispatch table
const TAG_TABLE: [(char, SampleField); 9] = [
    ('A', SampleField::GyroX),
    ('B', SampleField::GyroY),
    ('C', SampleField::GyroZ),
    ('D', SampleField::Flex(0)),
    ('E', SampleField::Flex(1)),
    ('F', SampleField::Flex(2)),
    ('G', SampleField::Flex(3)),
    ('H', SampleField::Flex(4)),
    ('T', SampleField::Timestamp),
];

/// Look up the field for a tag character
pub fn field_for_tag(tag: char) -> Option<SampleField> {
    TAG_TABLE
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, field)| *field)
}

/// Parse one framed packet into a sample
pub fn parse_packet(packet: &str) -> RawSample {
    let mut sample = RawSample::default();

    for token in packet.split(',') {
        let mut chars = token.chars();
        let Some(tag) = chars.next() else {
            continue;
        };
        let value = chars.as_str();
        if value.is_empty() {
            continue;
        }
        let Some(field) = field_for_tag(tag) else {
            continue;
        };
        let Ok(value) = value.trim().parse::<f32>() else {
            continue;
        };
        // NaN/inf would poison the filters for the rest of the session
        if !value.is_finite() {
            continue;
        }

        match field {
            SampleField::GyroX => sample.gyro.x = value,
            SampleField::GyroY => sample.gyro.y = value,
            SampleField::GyroZ => sample.gyro.z = value,
            SampleField::Flex(i) => sample.flex[i] = value,
            SampleField::Timestamp => sample.hw_timestamp_us = value,
        }
        sample.fields.insert(field);
    }

    sample
}
