//! Configuration value types for rocksync
//!
//! Small validated newtypes shared by the configuration layer and the
//! pipeline.

/// Worker pool size with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct ThreadCount(usize);

impl ThreadCount {
    /// Minimum thread count
    pub const MIN: usize = 1;
    /// Maximum thread count
    pub const MAX: usize = 256;
    /// Workers per logical CPU; transforms mostly wait on ffmpeg or disk
    pub const PER_CPU: usize = 2;

    /// Create a new thread count with validation
    pub fn new(count: usize) -> Result<Self, String> {
        if count < Self::MIN {
            Err(format!("Thread count {} is below minimum {}", count, Self::MIN))
        } else if count > Self::MAX {
            Err(format!("Thread count {} exceeds maximum {}", count, Self::MAX))
        } else {
            Ok(Self(count))
        }
    }

    /// Get the thread count value
    pub fn get(self) -> usize {
        self.0
    }

    /// Get the optimal thread count for the current system
    pub fn optimal() -> Self {
        Self((num_cpus::get() * Self::PER_CPU).clamp(Self::MIN, Self::MAX))
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::optimal()
    }
}

impl TryFrom<usize> for ThreadCount {
    type Error = String;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

impl From<ThreadCount> for usize {
    fn from(count: ThreadCount) -> Self {
        count.get()
    }
}

/// JPEG encoder quality with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct JpegQuality(u8);

impl JpegQuality {
    /// Lowest accepted quality
    pub const MIN: u8 = 1;
    /// Highest accepted quality
    pub const MAX: u8 = 100;
    /// Default quality
    pub const DEFAULT: u8 = 90;

    /// Create a new quality with validation
    pub fn new(quality: u8) -> Result<Self, String> {
        if quality < Self::MIN || quality > Self::MAX {
            Err(format!(
                "JPEG quality {} must be between {} and {}",
                quality,
                Self::MIN,
                Self::MAX
            ))
        } else {
            Ok(Self(quality))
        }
    }

    /// Get the quality value
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u8> for JpegQuality {
    type Error = String;

    fn try_from(quality: u8) -> Result<Self, Self::Error> {
        Self::new(quality)
    }
}

impl From<JpegQuality> for u8 {
    fn from(quality: JpegQuality) -> Self {
        quality.get()
    }
}
