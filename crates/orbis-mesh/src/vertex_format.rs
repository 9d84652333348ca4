//! Interleaved vertex layout handed to GPU-facing geometry sinks.

/// Position and normal of one mesh vertex, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RegionVertex {
    /// Position relative to the region centre.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
}

static_assertions::assert_eq_size!(RegionVertex, [u8; 24]);

impl RegionVertex {
    /// Byte stride of one vertex.
    pub const STRIDE: usize = std::mem::size_of::<Self>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_to_bytes() {
        let vertices = [
            RegionVertex {
                position: [1.0, 2.0, 3.0],
                normal: [0.0, 1.0, 0.0],
            };
            3
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * RegionVertex::STRIDE);
    }
}
