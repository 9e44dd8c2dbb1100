//! Flash interface trait
//!
//! Raw NOR flash access used by [`SectorFlashMedium`].
//!
//! [`SectorFlashMedium`]: crate::platform::media::SectorFlashMedium

use crate::platform::Result;

/// Flash interface trait
///
/// # Flash Characteristics
///
/// - Flash is organized in erase blocks (typically 4 KB)
/// - Erase operations set all bytes to 0xFF
/// - Write operations can only change bits from 1→0 (must erase first to reset to 1)
/// - Flash operations are blocking and can take 100ms+
///
/// # Safety Invariants
///
/// - Only one owner per Flash instance (no concurrent access)
/// - Must not erase/write the firmware region (implementations must validate addresses)
pub trait FlashInterface {
    /// Read `buf.len()` bytes starting at `address`
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::InvalidAddress)` if address is out of bounds.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` starting at `address`
    ///
    /// The target region must be erased first.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::InvalidAddress)` if address is in firmware region.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase `size` bytes starting at `address`
    ///
    /// Both must be aligned to [`block_size`](Self::block_size).
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::Unaligned)` on misaligned requests.
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Minimum erasable unit size
    fn block_size(&self) -> u32;

    /// Total Flash capacity in bytes
    fn capacity(&self) -> u32;
}
