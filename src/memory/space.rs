//! Memory spaces allocations are attributed to.

use crate::utils::error::ProfilerError;

/// Number of tracked memory spaces
pub const NSPACES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySpace {
    Host,
    Device,
}

impl MemorySpace {
    pub const ALL: [MemorySpace; NSPACES] = [MemorySpace::Host, MemorySpace::Device];

    /// Map a space handle name reported by the runtime
    pub fn from_handle_name(handle: &str) -> Result<Self, ProfilerError> {
        match handle.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(MemorySpace::Host),
            "cuda" | "cudauvm" | "cudahostpinned" | "hip" | "sycl" | "device" => {
                Ok(MemorySpace::Device)
            }
            _ => Err(ProfilerError::UnknownSpace(handle.to_string())),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            MemorySpace::Host => 0,
            MemorySpace::Device => 1,
        }
    }

    /// Label used in report headers
    pub fn label(&self) -> &'static str {
        match self {
            MemorySpace::Host => "HOST",
            MemorySpace::Device => "DEVICE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_names() {
        assert_eq!(MemorySpace::from_handle_name("Host").unwrap(), MemorySpace::Host);
        assert_eq!(MemorySpace::from_handle_name("Cuda").unwrap(), MemorySpace::Device);
        assert_eq!(MemorySpace::from_handle_name("HIP").unwrap(), MemorySpace::Device);
        assert!(matches!(
            MemorySpace::from_handle_name("Tape"),
            Err(ProfilerError::UnknownSpace(_))
        ));
    }

    #[test]
    fn test_indices_match_all() {
        for (i, space) in MemorySpace::ALL.iter().enumerate() {
            assert_eq!(space.index(), i);
        }
    }
}
