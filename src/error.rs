/// Errors raised at the frame boundary of the library.
///
/// Decoding itself is infallible by design (garbage-in-garbage-out, see
/// [`crate::protocol`]); only constructing a [`crate::protocol::Frame`] from
/// untrusted input can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A standard CAN identifier must fit in 11 bits.
    #[error("CAN identifier 0x{0:X} exceeds the 11-bit standard range")]
    IdOutOfRange(u32),
    /// A frame payload must be exactly 8 bytes.
    #[error("payload is {0} bytes, expected 8")]
    PayloadLength(usize),
}
