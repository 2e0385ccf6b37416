//! # Storage abstraction layer
//!
//! This module provides the storage traits the SDK needs to persist device
//! credentials on non-volatile memory. The traits are technology agnostic:
//! a flash part, an EEPROM, a battery-backed RAM or a host file can all sit
//! behind them, and they compile down to direct hardware calls.
//!
//! # Core Traits
//!
//! - [`ReadStorage`]: Read data from storage
//! - [`Storage`]: Read and write operations
//! - [`BlockingErase`]: Synchronous erase operations
//! - [`Region`]: Memory region management
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use iotlink::storage::{ReadStorage, Storage};
//!
//! fn read_record<S: ReadStorage>(storage: &mut S) -> Result<[u8; 4], S::Error> {
//!     let mut data = [0u8; 4];
//!     storage.read(0x1000, &mut data)?;
//!     Ok(data)
//! }
//!
//! fn store_record<S: Storage>(storage: &mut S, record: &[u8]) -> Result<(), S::Error> {
//!     storage.write(0x2000, record)?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for storage operations
pub mod error;


/// Re-exports of common traits for convenient importing
pub mod prelude {
    pub use super::{BlockingErase, ReadStorage, Region, Storage};
}

/// A contiguous memory region with start and end boundaries.
///
/// Useful for defining valid address ranges, protected areas, or organizing
/// storage into logical partitions (for example, the slot a credential
/// record lives in).
pub trait Region {
    /// Start address of the region (inclusive).
    fn start(&self) -> u32;

    /// End address of the region (exclusive).
    fn end(&self) -> u32;

    /// Check if an address is contained within this region.
    fn contains(&self, address: u32) -> bool {
        (address >= self.start()) && (address < self.end())
    }
}

/// Trait for reading data from storage devices.
///
/// This is the fundamental trait for all readable storage devices. It
/// provides a simple interface for reading data at specific offsets without
/// requiring write capabilities.
pub trait ReadStorage {
    /// Associated error type for read operations
    type Error: core::fmt::Debug;

    /// Read data from the storage device.
    ///
    /// Reads data from the specified offset into the provided buffer.
    /// The entire buffer will be filled unless an error occurs.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if offset + buffer length exceeds device capacity
    /// - `ReadError` if hardware read operation fails
    /// - `NotInitialized` if device is not properly initialized
    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error>;

    /// Get the total capacity of the storage device in bytes.
    fn capacity(&self) -> usize;
}

/// Trait for storage devices that support both read and write operations.
pub trait Storage: ReadStorage {
    /// Write data to the storage device.
    ///
    /// Writes the provided data to the specified offset. The behavior when
    /// writing to already-written locations depends on the storage
    /// technology (some require erase, others support overwrites).
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if offset + data length exceeds device capacity
    /// - `WriteError` if hardware write operation fails
    /// - `NotInitialized` if device is not properly initialized
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Trait for storage devices that support erase operations.
///
/// Many storage technologies (especially flash memory) require explicit
/// erase operations before writing new data.
pub trait BlockingErase: Storage {
    /// Erase a region of storage.
    ///
    /// Erases all data in the specified address range. After erasing, the
    /// erased region should read as `0xFF` bytes (flash memory convention).
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if the address range is invalid
    /// - `EraseError` if the hardware erase operation fails
    /// - `StorageFault` if the storage area is damaged and cannot be erased
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error>;
}
