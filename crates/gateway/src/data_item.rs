//! ANS-104 data items.
//!
//! Layout: signature type (u16 LE), signature, owner, target flag, anchor
//! flag + anchor, tag count (u64 LE), tag byte length (u64 LE), Avro-encoded
//! tags, data. The id is the base64url SHA-256 of the signature.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use evoapp_protocol::{Tag, TxId};
use sha2::{Digest, Sha256};

use crate::deep_hash::{Chunk, deep_hash};
use crate::error::GatewayError;
use crate::wallet::Wallet;

/// Signature type for Arweave RSA-PSS keys.
pub const SIGNATURE_TYPE_ARWEAVE: u16 = 1;

pub const MAX_TAGS: usize = 128;
pub const MAX_TAG_NAME_LEN: usize = 1024;
pub const MAX_TAG_VALUE_LEN: usize = 3072;

/// A signed, serialized data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub id: TxId,
    pub bytes: Vec<u8>,
}

/// Encodes tags as an Avro array of `{name: bytes, value: bytes}` records.
pub fn encode_tags(tags: &[Tag]) -> Result<Vec<u8>, GatewayError> {
    if tags.len() > MAX_TAGS {
        return Err(GatewayError::InvalidTag(format!(
            "too many tags: {} (max {MAX_TAGS})",
            tags.len()
        )));
    }
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        if tag.name.is_empty() || tag.name.len() > MAX_TAG_NAME_LEN {
            return Err(GatewayError::InvalidTag(format!(
                "name length {} out of range",
                tag.name.len()
            )));
        }
        if tag.value.len() > MAX_TAG_VALUE_LEN {
            return Err(GatewayError::InvalidTag(format!(
                "{:?} value too long ({} bytes)",
                tag.name,
                tag.value.len()
            )));
        }
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    out.push(0);
    Ok(out)
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

/// Zig-zag varint, as used by Avro `long`.
fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    loop {
        let byte = (z & 0x7f) as u8;
        z >>= 7;
        if z == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Signs `data` with `tags` into a data item. A random 32-byte anchor keeps
/// ids unique when the same content is signed twice.
pub fn sign_data_item(
    wallet: &Wallet,
    data: &[u8],
    tags: &[Tag],
) -> Result<DataItem, GatewayError> {
    let anchor: [u8; 32] = rand::random();
    sign_with_anchor(wallet, data, tags, Some(&anchor))
}

pub(crate) fn sign_with_anchor(
    wallet: &Wallet,
    data: &[u8],
    tags: &[Tag],
    anchor: Option<&[u8; 32]>,
) -> Result<DataItem, GatewayError> {
    let tag_bytes = encode_tags(tags)?;
    let anchor_bytes: &[u8] = anchor.map(|a| a.as_slice()).unwrap_or_default();
    let signature_type = SIGNATURE_TYPE_ARWEAVE.to_string();

    let fields = [
        Chunk::Blob(b"dataitem"),
        Chunk::Blob(b"1"),
        Chunk::Blob(signature_type.as_bytes()),
        Chunk::Blob(wallet.owner()),
        Chunk::Blob(&[]),
        Chunk::Blob(anchor_bytes),
        Chunk::Blob(&tag_bytes),
        Chunk::Blob(data),
    ];
    let message = deep_hash(&Chunk::List(&fields));
    let signature = wallet.sign(&message)?;

    let id = URL_SAFE_NO_PAD.encode(Sha256::digest(&signature));
    let id = TxId::parse(&id).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    let mut bytes = Vec::with_capacity(
        2 + signature.len() + wallet.owner().len() + 2 + 32 + 16 + tag_bytes.len() + data.len(),
    );
    bytes.extend_from_slice(&SIGNATURE_TYPE_ARWEAVE.to_le_bytes());
    bytes.extend_from_slice(&signature);
    bytes.extend_from_slice(wallet.owner());
    bytes.push(0); // no target
    match anchor {
        Some(anchor) => {
            bytes.push(1);
            bytes.extend_from_slice(anchor);
        }
        None => bytes.push(0),
    }
    bytes.extend_from_slice(&(tags.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&tag_bytes);
    bytes.extend_from_slice(data);

    Ok(DataItem { id, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::OWNER_LEN;
    use crate::wallet::tests::test_wallet;

    #[test]
    fn tag_encoding_vector() {
        let encoded = encode_tags(&[Tag::new("Content-Type", "text/html")]).unwrap();
        assert_eq!(
            hex::encode(encoded),
            "0218436f6e74656e742d5479706512746578742f68746d6c00"
        );
    }

    #[test]
    fn no_tags_encode_empty() {
        assert!(encode_tags(&[]).unwrap().is_empty());
    }

    #[test]
    fn long_encoding_is_zigzag() {
        let mut out = Vec::new();
        write_long(&mut out, 64);
        write_long(&mut out, 100);
        assert_eq!(out, vec![0x80, 0x01, 0xc8, 0x01]);
    }

    #[test]
    fn tag_limits_enforced() {
        let too_many: Vec<Tag> = (0..=MAX_TAGS).map(|i| Tag::new(format!("t{i}"), "v")).collect();
        assert!(encode_tags(&too_many).is_err());
        assert!(encode_tags(&[Tag::new("", "v")]).is_err());
        assert!(encode_tags(&[Tag::new("n", "v".repeat(MAX_TAG_VALUE_LEN + 1))]).is_err());
    }

    #[test]
    fn layout_and_signature() {
        let wallet = test_wallet();
        let tags = [Tag::new("Content-Type", "text/html")];
        let anchor = [7u8; 32];
        let item = sign_with_anchor(wallet, b"<html>", &tags, Some(&anchor)).unwrap();
        let b = &item.bytes;

        assert_eq!(&b[0..2], &[1, 0]);
        let signature = &b[2..2 + OWNER_LEN];
        let owner_end = 2 + 2 * OWNER_LEN;
        assert_eq!(&b[2 + OWNER_LEN..owner_end], wallet.owner());
        assert_eq!(b[owner_end], 0);
        assert_eq!(b[owner_end + 1], 1);
        assert_eq!(&b[owner_end + 2..owner_end + 34], &anchor);

        let counts = owner_end + 34;
        let tag_count = u64::from_le_bytes(b[counts..counts + 8].try_into().unwrap());
        let tag_len = u64::from_le_bytes(b[counts + 8..counts + 16].try_into().unwrap()) as usize;
        assert_eq!(tag_count, 1);
        let tag_bytes = &b[counts + 16..counts + 16 + tag_len];
        assert_eq!(tag_bytes, encode_tags(&tags).unwrap().as_slice());
        assert_eq!(&b[counts + 16 + tag_len..], b"<html>");

        let expected_id = URL_SAFE_NO_PAD.encode(Sha256::digest(signature));
        assert_eq!(item.id.as_str(), expected_id);

        let message = deep_hash(&Chunk::List(&[
            Chunk::Blob(b"dataitem"),
            Chunk::Blob(b"1"),
            Chunk::Blob(b"1"),
            Chunk::Blob(wallet.owner()),
            Chunk::Blob(&[]),
            Chunk::Blob(&anchor),
            Chunk::Blob(tag_bytes),
            Chunk::Blob(b"<html>"),
        ]));
        assert!(wallet.verify(&message, signature));
    }

    #[test]
    fn random_anchor_gives_distinct_ids() {
        let wallet = test_wallet();
        let a = sign_data_item(wallet, b"same", &[]).unwrap();
        let b = sign_data_item(wallet, b"same", &[]).unwrap();
        assert_ne!(a.id, b.id);
    }
}
