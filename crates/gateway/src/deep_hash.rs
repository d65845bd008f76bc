//! Arweave deep hash (SHA-384 over a tree of byte blobs).

use sha2::{Digest, Sha384};

/// A deep-hash input: a byte blob or a list of inputs.
#[derive(Debug, Clone, Copy)]
pub enum Chunk<'a> {
    Blob(&'a [u8]),
    List(&'a [Chunk<'a>]),
}

pub fn deep_hash(chunk: &Chunk<'_>) -> [u8; 48] {
    match chunk {
        Chunk::Blob(data) => {
            let tag = sha384(format!("blob{}", data.len()).as_bytes());
            let mut hasher = Sha384::new();
            hasher.update(tag);
            hasher.update(sha384(data));
            to_array(&hasher.finalize())
        }
        Chunk::List(items) => {
            let mut acc = sha384(format!("list{}", items.len()).as_bytes());
            for item in *items {
                let mut hasher = Sha384::new();
                hasher.update(acc);
                hasher.update(deep_hash(item));
                acc = to_array(&hasher.finalize());
            }
            acc
        }
    }
}

fn sha384(data: &[u8]) -> [u8; 48] {
    to_array(&Sha384::digest(data))
}

fn to_array(digest: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(digest);
    out
}
