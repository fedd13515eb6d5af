//! Decoding of the cross-chain call data attached to a transfer.
//!
//! The layout is:
//!
//! ```text
//! 0x01 | u32 endpoint length | endpoint | u64 gas length | gas (<= 8 bytes)
//!      | u32 argument count | (u32 argument length | argument)*
//! ```
//!
//! All integers are big endian. A leading `0x00` means the transfer carries no call.

use crate::errors::CallDataError;

/// Marker of a transfer without call data.
pub const MISSING_DATA_PROTOCOL_MARKER: u8 = 0x00;

/// Marker of a transfer that carries call data.
pub const DATA_PRESENT_PROTOCOL_MARKER: u8 = 0x01;

const U32_ARG_BYTES: usize = 4;
const U64_ARG_BYTES: usize = 8;

/// Renders call data in a human readable form for the logs.
///
/// Returns an empty string when the transfer carries no call.
pub fn convert_to_displayable_data(call_data: &[u8]) -> Result<String, CallDataError> {
    let (&marker, rest) = call_data
        .split_first()
        .ok_or(CallDataError::MissingMarker)?;

    match marker {
        MISSING_DATA_PROTOCOL_MARKER => Ok(String::new()),
        DATA_PRESENT_PROTOCOL_MARKER => convert_bytes_to_displayable_data(rest),
        other => Err(CallDataError::UnexpectedMarker(other)),
    }
}

fn convert_bytes_to_displayable_data(call_data: &[u8]) -> Result<String, CallDataError> {
    let mut reader = Reader { buf: call_data };

    let endpoint = reader.string("endpoint")?;
    let gas_limit = reader.gas_limit()?;
    let num_arguments = reader.u32("number of arguments")?;

    let mut arguments = Vec::new();
    for _ in 0..num_arguments {
        arguments.push(reader.string("argument")?);
    }

    Ok(format!(
        "Endpoint: {endpoint}, Gas: {gas_limit}, Arguments: {}",
        arguments.join("@")
    ))
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CallDataError> {
        if self.buf.len() < n {
            return Err(CallDataError::TooShort(field));
        }

        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, CallDataError> {
        let mut bytes = [0u8; U32_ARG_BYTES];
        bytes.copy_from_slice(self.take(U32_ARG_BYTES, field)?);
        Ok(u32::from_be_bytes(bytes))
    }

    fn string(&mut self, field: &'static str) -> Result<String, CallDataError> {
        let len = self.u32(field)? as usize;
        let data = self.take(len, field)?;
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    fn gas_limit(&mut self) -> Result<u64, CallDataError> {
        let mut len_bytes = [0u8; U64_ARG_BYTES];
        len_bytes.copy_from_slice(self.take(U64_ARG_BYTES, "gas limit length")?);
        let len = u64::from_be_bytes(len_bytes);
        if len > U64_ARG_BYTES as u64 {
            return Err(CallDataError::GasLimitTooLong(len));
        }

        let data = self.take(len as usize, "gas limit")?;
        let mut padded = [0u8; U64_ARG_BYTES];
        padded[U64_ARG_BYTES - data.len()..].copy_from_slice(data);
        Ok(u64::from_be_bytes(padded))
    }
}
