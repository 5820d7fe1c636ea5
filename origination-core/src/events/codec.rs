//! Binary encoding of [`StatusChangeEvent`]s.
//!
//! Every record on the topic is framed as
//!
//! ```text
//! [0x00][schema id: u32 big-endian][avro datum]
//! ```
//!
//! ## Known limitation
//!
//! Decoding always uses the schema the codec was built with. The schema id
//! embedded in the header is exposed but never looked up, so a record written
//! against a different schema version is only caught if its body fails to
//! decode structurally.

use crate::events::StatusChangeEvent;
use apache_avro::types::Value;
use apache_avro::{Schema, from_avro_datum, from_value, to_avro_datum, to_value};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use thiserror::Error;

/// Avro schema of the status change record, as registered with the registry.
pub const APPLICATION_EVENT_SCHEMA: &str = include_str!("../../schemas/application_event.avsc");

const MAGIC_BYTE: u8 = 0x00;
const HEADER_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message too short: {len} bytes, header needs 5")]
    ShortMessage { len: usize },

    #[error("unknown magic byte {0:#04x}")]
    UnknownMagicByte(u8),

    #[error("invalid avro schema: {0}")]
    Schema(#[source] apache_avro::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[source] apache_avro::Error),

    #[error("failed to decode event: {0}")]
    DecodeError(#[source] apache_avro::Error),

    #[error("decoded datum is not a record")]
    UnexpectedShape,
}

/// A framed record split into header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEnvelope<'a> {
    pub schema_id: u32,
    pub body: &'a [u8],
}

impl<'a> WireEnvelope<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, CodecError> {
        let Some((header, body)) = payload.split_first_chunk::<HEADER_LEN>() else {
            return Err(CodecError::ShortMessage {
                len: payload.len(),
            });
        };
        let [magic, id @ ..] = *header;
        if magic != MAGIC_BYTE {
            return Err(CodecError::UnknownMagicByte(magic));
        }
        Ok(Self {
            schema_id: u32::from_be_bytes(id),
            body,
        })
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.body.len());
        buf.put_u8(MAGIC_BYTE);
        buf.put_u32(self.schema_id);
        buf.put_slice(self.body);
        buf.freeze()
    }
}

/// Encodes and decodes events against one bound Avro schema.
#[derive(Debug, Clone)]
pub struct EventCodec {
    schema: Schema,
    schema_text: Arc<str>,
}

impl EventCodec {
    pub fn new(schema_text: &str) -> Result<Self, CodecError> {
        let schema = Schema::parse_str(schema_text).map_err(CodecError::Schema)?;
        Ok(Self {
            schema,
            schema_text: Arc::from(schema_text),
        })
    }

    /// Codec bound to [`APPLICATION_EVENT_SCHEMA`].
    pub fn with_default_schema() -> Result<Self, CodecError> {
        Self::new(APPLICATION_EVENT_SCHEMA)
    }

    /// Schema text as given at construction, used for registry lookups.
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    pub fn encode(&self, schema_id: u32, event: &StatusChangeEvent) -> Result<Bytes, CodecError> {
        let value = to_value(event)
            .and_then(|value| value.resolve(&self.schema))
            .map_err(CodecError::Encode)?;
        let body = to_avro_datum(&self.schema, value).map_err(CodecError::Encode)?;
        Ok(WireEnvelope {
            schema_id,
            body: &body,
        }
        .to_bytes())
    }

    pub fn decode(&self, payload: &[u8]) -> Result<StatusChangeEvent, CodecError> {
        let envelope = WireEnvelope::parse(payload)?;
        let mut body = envelope.body;
        let value =
            from_avro_datum(&self.schema, &mut body, None).map_err(CodecError::DecodeError)?;
        if !matches!(value, Value::Record(_)) {
            return Err(CodecError::UnexpectedShape);
        }
        from_value::<StatusChangeEvent>(&value).map_err(CodecError::DecodeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_event;

    #[test]
    fn test_header_carries_schema_id_big_endian() {
        let codec = EventCodec::with_default_schema().unwrap();
        let bytes = codec.encode(0x0102_0304, &sample_event()).unwrap();
        assert_eq!(&bytes[..5], &[0x00, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(WireEnvelope::parse(&bytes).unwrap().schema_id, 0x0102_0304);
    }

    #[test]
    fn test_encoded_event_decodes_to_same_value() {
        let codec = EventCodec::with_default_schema().unwrap();
        let mut event = sample_event();
        event.agreement_details.payment_date = Some(1_717_000_000_000);

        let bytes = codec.encode(7, &event).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), event);

        event.agreement_details.payment_date = None;
        let bytes = codec.encode(7, &event).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), event);
    }

    #[test]
    fn test_edge_values_survive_encoding() {
        let codec = EventCodec::with_default_schema().unwrap();
        let base = sample_event();
        let mut cases = Vec::new();

        let mut empty = base.clone();
        empty.message_id = String::new();
        empty.application_id = String::new();
        empty.agreement_details.client_id = String::new();
        empty.agreement_details.product_version = String::new();
        cases.push(empty);

        let mut unicode = base.clone();
        unicode.agreement_details.product_code = "кредит-γ-信用-💳".to_string();
        unicode.agreement_details.to_bank_account_id = "ÄÖÜ\u{0}tail".to_string();
        cases.push(unicode);

        for timestamp in [i64::MIN, -1, 0, i64::MAX] {
            let mut event = base.clone();
            event.timestamp = timestamp;
            event.agreement_details.payment_date = Some(timestamp);
            cases.push(event);
        }

        for term in [i32::MIN, 0, i32::MAX] {
            let mut event = base.clone();
            event.agreement_details.term = term;
            cases.push(event);
        }

        let mut precise = base.clone();
        precise.agreement_details.interest = "0.0000000000000000000000000001".to_string();
        precise.agreement_details.disbursement_amount =
            "79228162514264337593543950335".to_string();
        precise.agreement_details.origination_amount = "-12345678901234.5678901234".to_string();
        cases.push(precise);

        for event in cases {
            let bytes = codec.encode(u32::MAX, &event).unwrap();
            assert_eq!(WireEnvelope::parse(&bytes).unwrap().schema_id, u32::MAX);
            assert_eq!(codec.decode(&bytes).unwrap(), event);
        }
    }

    #[test]
    fn test_short_input_is_rejected() {
        let codec = EventCodec::with_default_schema().unwrap();
        for len in 0..5 {
            let input = vec![0u8; len];
            assert!(matches!(
                codec.decode(&input),
                Err(CodecError::ShortMessage { len: l }) if l == len
            ));
        }
    }

    #[test]
    fn test_unknown_magic_byte_is_rejected() {
        let codec = EventCodec::with_default_schema().unwrap();
        let mut bytes = codec.encode(1, &sample_event()).unwrap().to_vec();
        bytes[0] = 0x01;
        assert!(matches!(
            codec.decode(&bytes),
            Err(CodecError::UnknownMagicByte(0x01))
        ));
    }

    #[test]
    fn test_truncated_body_is_decode_error() {
        let codec = EventCodec::with_default_schema().unwrap();
        let bytes = codec.encode(1, &sample_event()).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            codec.decode(truncated),
            Err(CodecError::DecodeError(_))
        ));
    }

    #[test]
    fn test_non_record_datum_is_unexpected_shape() {
        let codec = EventCodec::new(r#""string""#).unwrap();
        let body = to_avro_datum(&Schema::String, Value::String("hello".into())).unwrap();
        let payload = WireEnvelope {
            schema_id: 1,
            body: &body,
        }
        .to_bytes();
        assert!(matches!(
            codec.decode(&payload),
            Err(CodecError::UnexpectedShape)
        ));
    }

    #[test]
    fn test_invalid_schema_text() {
        assert!(matches!(
            EventCodec::new("{ not avro"),
            Err(CodecError::Schema(_))
        ));
    }
}
