//! Fixed-width little-endian primitives shared by the instruction payloads and
//! the account records. Layouts are plain sequences of these fields; the only
//! checks performed here are length checks.

use anchor_lang::prelude::*;

use crate::constants::MEMO_LEN;
use crate::errors::ErrorCode;

pub type Memo = [u8; MEMO_LEN];

#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u8(value as u8)
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn pubkey(&mut self, value: &Pubkey) -> &mut Self {
        self.buf.extend_from_slice(value.as_ref());
        self
    }

    pub fn bytes32(&mut self, value: &[u8; 32]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct ByteReader<'a> {
    input: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Starts reading a layout whose total length must be exactly `span`.
    pub fn exact(input: &'a [u8], span: usize) -> Result<Self> {
        if input.len() != span {
            return Err(ErrorCode::MalformedRecord.into());
        }
        Ok(Self { input })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.input.len() < n {
            return Err(ErrorCode::MalformedRecord.into());
        }
        let (head, rest) = self.input.split_at(n);
        self.input = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Any non-zero byte reads as `true`.
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array::<8>()?))
    }

    pub fn pubkey(&mut self) -> Result<Pubkey> {
        Ok(Pubkey::new_from_array(self.array::<32>()?))
    }

    pub fn bytes32(&mut self) -> Result<[u8; 32]> {
        self.array::<32>()
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

/// Encodes a memo as null-padded UTF-8.
pub fn string_to_bytes(string: &str) -> Result<Memo> {
    let string_bytes = string.as_bytes();

    if string_bytes.len() > MEMO_LEN {
        return Err(ErrorCode::StringTooLong.into());
    }

    let mut string_data = [0u8; MEMO_LEN];
    string_data[..string_bytes.len()].copy_from_slice(string_bytes);

    Ok(string_data)
}

/// Decodes a null-padded memo. Invalid UTF-8 is replaced rather than rejected.
pub fn bytes_to_string(bytes: &Memo) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
