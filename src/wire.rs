//! The §6 ASCII wire codec (enrichment, §2b).
//!
//! `TYPE:SENDER:PROPOSAL:VALUE[:ACCEPTED_N:ACCEPTED_V]`, fields separated by
//! `:`, empty strings for unset optional fields, newline-terminated.
//! `PROPOSAL` is `<round>.<nodeId>`. This module has no socket code and sits
//! outside the core dispatch path — it exists so that a `Transport`
//! implementor has a ready, spec-conformant codec to call from their own
//! `send`/inbound-callback glue, matching the teacher's `NetNode::send`/
//! `receive` serialize/deserialize pairing but as a string codec instead of
//! `bincode` framing.

use thiserror::Error;

use crate::message::{AcceptRequest, Accepted, Learn, Message, Prepare, Promise};
use crate::node::NodeId;
use crate::proposal::ProposalNumber;
use crate::value::Value;

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("empty line")]
    EmptyLine,
    #[error("unknown message type {0:?}")]
    UnknownType(String),
    #[error("expected at least {expected} fields, got {got}")]
    TooFewFields { expected: usize, got: usize },
    #[error("invalid sender {0:?}")]
    InvalidSender(String),
    #[error("invalid proposal number {0:?}")]
    InvalidProposal(String),
}

/// Encodes `msg` as one newline-terminated ASCII line.
pub fn encode(msg: &Message) -> String {
    let mut line = match msg {
        Message::Prepare(Prepare { sender, n }) => {
            format!("PREPARE:{}:{}:", sender, encode_proposal(n))
        }
        Message::Promise(Promise { sender, n, last_accepted }) => {
            let mut s = format!("PROMISE:{}:{}:", sender, encode_proposal(n));
            match last_accepted {
                Some((na, va)) => {
                    s.push_str(&format!(":{}:{}", encode_proposal(na), encode_value(va)));
                }
                None => s.push_str("::"),
            }
            s
        }
        Message::AcceptRequest(AcceptRequest { sender, n, value }) => {
            format!("ACCEPT_REQUEST:{}:{}:{}", sender, encode_proposal(n), encode_value(value))
        }
        Message::Accepted(Accepted { sender, n, value }) => {
            format!("ACCEPTED:{}:{}:{}", sender, encode_proposal(n), encode_value(value))
        }
        Message::Learn(Learn { sender, n, value }) => {
            format!("LEARN:{}:{}:{}", sender, encode_proposal(n), encode_value(value))
        }
    };
    line.push('\n');
    line
}

/// Decodes one line (trailing newline optional) back into a `Message`.
/// Preserves trailing empty fields — `"PROMISE:1:1.1:::"` decodes with
/// `last_accepted = None`, not a parse error, since the two trailing empty
/// fields are the prescribed "unset optional field" encoding.
pub fn decode(line: &str) -> Result<Message, WireError> {
    let line = line.trim_end_matches('\n').trim_end_matches('\r');
    if line.is_empty() {
        return Err(WireError::EmptyLine);
    }

    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < 4 {
        return Err(WireError::TooFewFields { expected: 4, got: fields.len() });
    }

    let sender: NodeId =
        fields[1].parse().map_err(|_| WireError::InvalidSender(fields[1].to_string()))?;
    let n = decode_proposal(fields[2])?;
    let value_field = fields[3];

    match fields[0] {
        "PREPARE" => Ok(Message::Prepare(Prepare { sender, n })),
        "PROMISE" => {
            let last_accepted = if fields.len() >= 6 && !fields[4].is_empty() {
                let na = decode_proposal(fields[4])?;
                let va = decode_value(fields[5]);
                Some((na, va))
            } else {
                None
            };
            Ok(Message::Promise(Promise { sender, n, last_accepted }))
        }
        "ACCEPT_REQUEST" => {
            Ok(Message::AcceptRequest(AcceptRequest { sender, n, value: decode_value(value_field) }))
        }
        "ACCEPTED" => Ok(Message::Accepted(Accepted { sender, n, value: decode_value(value_field) })),
        "LEARN" => Ok(Message::Learn(Learn { sender, n, value: decode_value(value_field) })),
        other => Err(WireError::UnknownType(other.to_string())),
    }
}

fn encode_proposal(n: &ProposalNumber) -> String {
    format!("{}.{}", n.round, n.node_id)
}

fn decode_proposal(field: &str) -> Result<ProposalNumber, WireError> {
    let (round_str, node_str) =
        field.split_once('.').ok_or_else(|| WireError::InvalidProposal(field.to_string()))?;
    let round = round_str.parse().map_err(|_| WireError::InvalidProposal(field.to_string()))?;
    let node_id = node_str.parse().map_err(|_| WireError::InvalidProposal(field.to_string()))?;
    Ok(ProposalNumber { round, node_id })
}

fn encode_value(value: &Value) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

fn decode_value(field: &str) -> Value {
    Value::from(field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pn(round: u64, node_id: NodeId) -> ProposalNumber {
        ProposalNumber { round, node_id }
    }

    #[test]
    fn round_trips_prepare() {
        let msg = Message::Prepare(Prepare { sender: 2, n: pn(1, 2) });
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn round_trips_promise_without_prior_accept() {
        let msg = Message::Promise(Promise { sender: 3, n: pn(1, 2), last_accepted: None });
        let encoded = encode(&msg);
        assert_eq!(encoded, "PROMISE:3:1.2:::\n");
        assert_eq!(decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn round_trips_promise_with_prior_accept() {
        let msg = Message::Promise(Promise {
            sender: 3,
            n: pn(2, 2),
            last_accepted: Some((pn(1, 1), Value::from("A"))),
        });
        let encoded = encode(&msg);
        assert_eq!(decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn round_trips_accept_request_accepted_and_learn() {
        let n = pn(1, 5);
        let v = Value::from("M5");
        assert_eq!(
            decode(&encode(&Message::AcceptRequest(AcceptRequest { sender: 5, n, value: v.clone() }))).unwrap(),
            Message::AcceptRequest(AcceptRequest { sender: 5, n, value: v.clone() })
        );
        assert_eq!(
            decode(&encode(&Message::Accepted(Accepted { sender: 5, n, value: v.clone() }))).unwrap(),
            Message::Accepted(Accepted { sender: 5, n, value: v.clone() })
        );
        assert_eq!(
            decode(&encode(&Message::Learn(Learn { sender: 5, n, value: v.clone() }))).unwrap(),
            Message::Learn(Learn { sender: 5, n, value: v })
        );
    }

    #[test]
    fn trailing_empty_fields_are_preserved_not_trimmed() {
        let decoded = decode("PROMISE:1:1.1:::\n").unwrap();
        assert_eq!(decoded, Message::Promise(Promise { sender: 1, n: pn(1, 1), last_accepted: None }));
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert_eq!(decode("FOO:1:1.1:\n"), Err(WireError::UnknownType("FOO".to_string())));
    }

    #[test]
    fn empty_line_is_an_error() {
        assert_eq!(decode(""), Err(WireError::EmptyLine));
        assert_eq!(decode("\n"), Err(WireError::EmptyLine));
    }
}
