//! Test data builders for creating wire packets

/// Builder for glove wire packets
#[derive(Debug, Clone, Default)]
pub struct PacketBuilder {
    gyro: Option<[f32; 3]>,
    flex: Option<[f32; 5]>,
    timestamp_us: Option<f32>,
    extra: Vec<String>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gyro(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gyro = Some([x, y, z]);
        self
    }

    /// Flex channels in wire order (pinky first)
    pub fn flex(mut self, flex: [f32; 5]) -> Self {
        self.flex = Some(flex);
        self
    }

    pub fn timestamp(mut self, us: f32) -> Self {
        self.timestamp_us = Some(us);
        self
    }

    /// Append a raw token as-is
    pub fn token(mut self, token: &str) -> Self {
        self.extra.push(token.to_string());
        self
    }

    /// Packet text without terminator
    pub fn build(self) -> String {
        let mut tokens = Vec::new();
        if let Some([x, y, z]) = self.gyro {
            tokens.push(format!("A{x}"));
            tokens.push(format!("B{y}"));
            tokens.push(format!("C{z}"));
        }
        if let Some(flex) = self.flex {
            for (tag, value) in ['D', 'E', 'F', 'G', 'H'].iter().zip(flex) {
                tokens.push(format!("{tag}{value}"));
            }
        }
        if let Some(t) = self.timestamp_us {
            tokens.push(format!("T{t}"));
        }
        tokens.extend(self.extra);
        tokens.join(",")
    }

    /// Packet bytes with the `#` terminator
    pub fn wire(self) -> Vec<u8> {
        let mut bytes = self.build().into_bytes();
        bytes.push(b'#');
        bytes
    }
}

/// Concatenate framed packets into one byte stream
pub fn wire_stream(packets: impl IntoIterator<Item = PacketBuilder>) -> Vec<u8> {
    packets.into_iter().flat_map(PacketBuilder::wire).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_builder() {
        let packet = PacketBuilder::new()
            .gyro(1.0, 2.5, -3.0)
            .timestamp(1000.0)
            .token("Zfoo")
            .build();

        assert_eq!(packet, "A1,B2.5,C-3,T1000,Zfoo");
    }
}
